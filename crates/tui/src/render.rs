use pgai_core::confirm::DestructiveAction;
use pgai_core::insights::AiInsight;
use pgai_core::results::{render_cell, render_mode, RenderMode};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use crate::app::{LibraryView, Mode, TuiApp};

const FOOTER_ACTIONS_LIMIT: usize = 8;
const CHAT_SQL_PREVIEW_LINES: usize = 3;

pub(crate) fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(chunks[1]);
    let workspace = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(body[0]);

    render_editor(frame, app, workspace[0]);
    render_results(frame, app, workspace[1]);
    render_chat(frame, app, body[1]);
    render_footer(frame, app, chunks[2]);

    if let Some(insight) = app.workspace.insight().displayed() {
        render_insight_popup(frame, insight);
    }
    match &app.mode {
        Mode::Editing => {}
        Mode::Prompt { purpose, buffer } => render_prompt_popup(frame, purpose.title(), buffer),
        Mode::Library { view, selected } => render_library_popup(frame, app, *view, *selected),
        Mode::Confirm { action, .. } => render_confirm_popup(frame, *action),
    }
}

fn render_header(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let tabs = app.workspace.tabs();
    let mut spans = vec![
        Span::styled(
            format!(" {} ", app.connection_label()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" |"),
    ];
    for tab in tabs.tabs() {
        let label = if tab.is_executing() {
            format!(" {}* ", tab.name())
        } else {
            format!(" {} ", tab.name())
        };
        let style = if tab.id() == tabs.active_id() {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        spans.push(Span::styled(label, style));
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("pgai"));
    frame.render_widget(header, area);
}

fn render_editor(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let tab = app.workspace.active_tab();
    let mut lines = tab.content().lines().map(Line::from).collect::<Vec<_>>();
    if tab.content().is_empty() || tab.content().ends_with('\n') {
        lines.push(Line::from(""));
    }
    if let Some(last) = lines.last_mut() {
        last.spans.push(Span::styled("_", Style::default().fg(Color::DarkGray)));
    }

    let suggestions = app.suggestions();
    let title = if suggestions.is_empty() {
        format!("Editor: {}", tab.name())
    } else {
        let labels = suggestions
            .iter()
            .map(|suggestion| suggestion.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("Editor: {} | Tab: {labels}", tab.name())
    };

    let editor = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(editor, area);
}

fn render_results(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let tab = app.workspace.active_tab();
    let block = Block::default().borders(Borders::ALL);

    let Some(result) = tab.result() else {
        let hint = if tab.is_executing() {
            "Running..."
        } else {
            "Press F5 to run the query"
        };
        frame.render_widget(Paragraph::new(hint).block(block.title("Results")), area);
        return;
    };

    match render_mode(result) {
        RenderMode::Error(message) => {
            let error = Paragraph::new(message)
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: false })
                .block(block.title("Error"));
            frame.render_widget(error, area);
        }
        RenderMode::Status {
            message,
            execution_time,
        } => {
            let mut lines = vec![Line::from(message)];
            if let Some(seconds) = execution_time {
                lines.push(Line::from(format!("Execution time: {seconds}s")));
            }
            frame.render_widget(Paragraph::new(lines).block(block.title("Results")), area);
        }
        RenderMode::Empty => {
            let empty = Paragraph::new("No rows returned")
                .alignment(Alignment::Center)
                .block(block.title(result.summary_line()));
            frame.render_widget(empty, area);
        }
        RenderMode::Grid => {
            let paginator = app.workspace.paginator();
            let total = app.workspace.grid_rows().len();
            let title = format!(
                "{} | page {}/{} | {} per page",
                result.summary_line(),
                paginator.page() + 1,
                paginator.total_pages(total).max(1),
                paginator.page_size().rows()
            );

            let header = Row::new(result.columns.iter().map(String::as_str))
                .style(Style::default().add_modifier(Modifier::BOLD));
            let rows = app.workspace.visible_rows().iter().map(|row| {
                Row::new(
                    result
                        .row_values(row)
                        .map(|value| render_cell(value).shown().to_string()),
                )
            });
            let widths = result.columns.iter().map(|_| Constraint::Fill(1));
            let table = Table::new(rows, widths)
                .header(header)
                .block(block.title(title));
            frame.render_widget(table, area);
        }
    }
}

fn render_chat(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let mut lines = Vec::new();
    for conversation in app.workspace.conversations() {
        lines.push(Line::from(Span::styled(
            format!("> {}", conversation.user_prompt),
            Style::default().fg(Color::Cyan),
        )));
        if conversation.is_answered() {
            lines.extend(
                conversation
                    .generated_sql
                    .lines()
                    .take(CHAT_SQL_PREVIEW_LINES)
                    .map(|line| Line::from(format!("  {line}"))),
            );
        } else {
            lines.push(Line::from("  ..."));
        }
        lines.push(Line::from(""));
    }
    if lines.is_empty() {
        lines.push(Line::from("Ctrl+G to ask for SQL"));
    }
    if app.chat_sql.is_some() {
        lines.push(Line::from(Span::styled(
            "Ctrl+Y inserts the latest answer",
            Style::default().fg(Color::Green),
        )));
    }

    let title = if app.generating {
        "Assistant (thinking)"
    } else {
        "Assistant"
    };
    let chat = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(chat, area);
}

fn render_footer(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let actions = app.actions.enabled_actions(&app.workspace.action_context());
    let footer_line = if actions.is_empty() {
        "No available actions in this context".to_string()
    } else {
        actions
            .iter()
            .take(FOOTER_ACTIONS_LIMIT)
            .map(|action| format!("{}:{} ", action.key_hint, action.title))
            .collect::<Vec<_>>()
            .join("| ")
    };
    let requesting = app
        .workspace
        .insight()
        .requesting()
        .map(|action| format!(" ({} running)", action.title()))
        .unwrap_or_default();

    let footer = Paragraph::new(vec![
        Line::from(footer_line),
        Line::from(format!("Status: {}{requesting}", app.status_line)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Actions"));
    frame.render_widget(footer, area);
}

fn insight_lines(insight: &AiInsight) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut section = |heading: &'static str, items: &[String]| {
        if items.is_empty() {
            return;
        }
        lines.push(Line::from(Span::styled(
            heading,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.extend(items.iter().map(|item| Line::from(format!("- {item}"))));
    };

    match insight {
        AiInsight::Generated { prompt, sql } => {
            section("Prompt", std::slice::from_ref(prompt));
            section("SQL", std::slice::from_ref(sql));
        }
        AiInsight::Explanation(explanation) => {
            section("Explanation", std::slice::from_ref(&explanation.explanation));
        }
        AiInsight::Debug(advice) => {
            section("What went wrong", std::slice::from_ref(&advice.explanation));
            if let Some(fixed) = &advice.fixed_query {
                section("Fixed query", std::slice::from_ref(fixed));
            }
        }
        AiInsight::Optimization(optimization) => {
            if let Some(rewrite) = optimization.rewrite() {
                section("Optimized query", &[rewrite.to_string()]);
            }
            section("Suggestions", &optimization.suggestions);
            section("Explanation", std::slice::from_ref(&optimization.explanation));
        }
        AiInsight::PlanAnalysis(analysis) => {
            section("Summary", std::slice::from_ref(&analysis.summary));
            section("Bottlenecks", &analysis.bottlenecks);
            section("Insights", &analysis.insights);
            section("Recommendations", &analysis.recommendations);
        }
        AiInsight::Indexes(advice) => {
            let recommendations = advice
                .recommendations
                .iter()
                .map(|recommendation| {
                    let target = recommendation.table.as_deref().unwrap_or("?");
                    format!(
                        "{target}({}): {}",
                        recommendation.columns.join(", "),
                        recommendation.reason
                    )
                })
                .collect::<Vec<_>>();
            if recommendations.is_empty() {
                section("Indexes", &["No index changes suggested".to_string()]);
            } else {
                section("Indexes", &recommendations);
            }
            if let Some(analyzed) = advice.analyzed_queries {
                section("Analyzed", &[format!("{analyzed} slow queries")]);
            }
        }
    }
    lines
}

fn render_insight_popup(frame: &mut Frame<'_>, insight: &AiInsight) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = insight_lines(insight);
    lines.push(Line::from(""));
    lines.push(Line::from(if insight.insertable_sql().is_some() {
        "Ctrl+U: insert SQL | Esc: dismiss"
    } else {
        "Esc: dismiss"
    }));

    let popup = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(insight.action().title()),
        );
    frame.render_widget(popup, area);
}

fn render_prompt_popup(frame: &mut Frame<'_>, title: &str, buffer: &str) {
    let area = centered_rect(60, 20, frame.area());
    frame.render_widget(Clear, area);
    let prompt = Paragraph::new(vec![
        Line::from(format!("{buffer}_")),
        Line::from(""),
        Line::from("Enter: submit | Esc: cancel"),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(prompt, area);
}

fn render_library_popup(frame: &mut Frame<'_>, app: &TuiApp, view: LibraryView, selected: usize) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let entries = app.library_entries(view);
    let selected = selected.min(entries.len().saturating_sub(1));
    let mut lines = Vec::new();
    let mut folder = None;
    for (index, entry) in entries.iter().enumerate() {
        if let Some(name) = entry.folder {
            if folder != Some(name) {
                folder = Some(name);
                lines.push(Line::from(Span::styled(
                    name.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
            }
        }
        let style = if index == selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        let preview = entry.query.lines().next().unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!("  {}: {preview}", entry.label),
            style,
        )));
    }
    if entries.is_empty() {
        lines.push(Line::from(view.empty_hint()));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(
        "Enter: open | d: delete | Tab: favorites/history | Esc: close",
    ));

    let popup = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(view.title()));
    frame.render_widget(popup, area);
}

fn render_confirm_popup(frame: &mut Frame<'_>, action: DestructiveAction) {
    let area = centered_rect(50, 20, frame.area());
    frame.render_widget(Clear, area);
    let popup = Paragraph::new(vec![
        Line::from(action.prompt()),
        Line::from(""),
        Line::from("y: confirm | n: cancel"),
    ])
    .wrap(Wrap { trim: false })
    .block(Block::default().borders(Borders::ALL).title("Confirm"));
    frame.render_widget(popup, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use pgai_core::confirm::DestructiveAction;
    use pgai_core::favorites::FavoriteQuery;
    use pgai_core::insights::{AiInsight, IndexAdvice, IndexRecommendation};
    use pgai_core::workspace::Workspace;
    use ratatui::backend::TestBackend;
    use ratatui::layout::Rect;
    use ratatui::Terminal;

    use super::{centered_rect, insight_lines, render};
    use crate::app::{LibraryView, Mode, Msg, PromptPurpose, TuiApp, TuiOptions};

    fn draw(app: &TuiApp) -> String {
        let mut terminal =
            Terminal::new(TestBackend::new(120, 32)).expect("test terminal should build");
        terminal
            .draw(|frame| render(frame, app))
            .expect("frame should render");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn centered_rect_stays_inside_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(60, 50, area);
        assert_eq!(popup.width, 60);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 20);
        assert_eq!(popup.y, 10);
    }

    #[test]
    fn idle_workspace_shows_hints_and_status() {
        let app = TuiApp::new(Workspace::default(), TuiOptions::default());
        let screen = draw(&app);
        assert!(screen.contains("no connection"));
        assert!(screen.contains("Press F5 to run the query"));
        assert!(screen.contains("Ctrl+G to ask for SQL"));
        assert!(screen.contains("Loading connections..."));
    }

    #[test]
    fn prompt_popup_echoes_typed_text() {
        let mut app = TuiApp::new(Workspace::default(), TuiOptions::default());
        app.mode = Mode::Prompt {
            purpose: PromptPurpose::AskAi,
            buffer: String::new(),
        };
        for ch in "top users".chars() {
            app.handle(Msg::Input(ch));
        }
        let screen = draw(&app);
        assert!(screen.contains("Ask AI"));
        assert!(screen.contains("top users_"));
    }

    #[test]
    fn library_popup_groups_favorites_under_folders() {
        let mut workspace = Workspace::default();
        let mut weekly = FavoriteQuery::new("weekly revenue", "SELECT sum(total)\nFROM orders", None)
            .expect("valid favorite");
        weekly.id = Some(1);
        weekly.folder = Some("Reports".to_string());
        workspace.install_favorites(vec![weekly]);
        let mut app = TuiApp::new(workspace, TuiOptions::default());
        app.mode = Mode::Library {
            view: LibraryView::Favorites,
            selected: 0,
        };

        let screen = draw(&app);
        assert!(screen.contains("Favorites"));
        assert!(screen.contains("Reports"));
        assert!(screen.contains("weekly revenue: SELECT sum(total)"));
        assert!(!screen.contains("FROM orders"));
        assert!(screen.contains("d: delete"));
    }

    #[test]
    fn empty_history_shows_hint_and_confirm_shows_prompt() {
        let mut app = TuiApp::new(Workspace::default(), TuiOptions::default());
        app.mode = Mode::Library {
            view: LibraryView::History,
            selected: 0,
        };
        assert!(draw(&app).contains(LibraryView::History.empty_hint()));

        let action = DestructiveAction::DeleteFavorite(1);
        app.mode = Mode::Confirm {
            token: app.workspace.request_confirmation(action),
            action,
            view: LibraryView::Favorites,
            selected: 0,
        };
        let screen = draw(&app);
        assert!(screen.contains(action.prompt()));
        assert!(screen.contains("y: confirm | n: cancel"));
    }

    #[test]
    fn index_advice_lists_targets_and_batch_size() {
        let insight = AiInsight::Indexes(IndexAdvice {
            recommendations: vec![IndexRecommendation {
                table: Some("orders".to_string()),
                columns: vec!["customer_id".to_string(), "created_at".to_string()],
                reason: "filtered and sorted together".to_string(),
                create_statement: Some("CREATE INDEX ON orders (customer_id, created_at);".to_string()),
            }],
            analyzed_queries: Some(12),
        });
        let text = insight_lines(&insight)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert!(text.contains(&"- orders(customer_id, created_at): filtered and sorted together".to_string()));
        assert!(text.contains(&"- 12 slow queries".to_string()));
    }
}
