//! Plain-text rendering of the view model for the terminal.
use std::fmt::Write;

use chrono::Local;
use giftcheck_core::{AppViewModel, Category, ResultRowView, ResultStatus};

/// Summary, statistics and the current page of results.
pub fn render(view: &AppViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Report generated {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    if let Some(mode) = view.mode {
        let _ = writeln!(out, "Mode: {mode}");
    }
    if let Some(submit) = view.last_submit {
        let _ = write!(
            out,
            "Submitted: {} valid, {} rejected, {} skipped",
            submit.accepted, submit.rejected, submit.skipped
        );
        if submit.requeued > 0 {
            let _ = write!(out, ", {} unchecked from earlier", submit.requeued);
        }
        out.push('\n');
    }
    if let Some(error) = &view.last_error {
        let _ = writeln!(out, "Last batch failed: {error}");
    }

    render_statistics(&mut out, view);

    let _ = writeln!(
        out,
        "\nResults {} matching, page {}/{}",
        view.matching, view.page, view.total_pages
    );
    for row in &view.rows {
        let _ = writeln!(out, "{}", render_row(row));
    }
    out
}

fn render_statistics(out: &mut String, view: &AppViewModel) {
    let stats = &view.statistics;
    let _ = writeln!(
        out,
        "\nLinks: {}  Results: {}  Succeeded: {}  Errors: {}",
        view.link_count, stats.total, stats.success, stats.errors
    );
    for category in [
        Category::Available,
        Category::Valid,
        Category::Expired,
        Category::Claimed,
        Category::Invalid,
        Category::Unknown,
    ] {
        let count = stats.count(category);
        if count > 0 {
            let _ = writeln!(out, "  {:<10} {}", category.as_str(), count);
        }
    }
    if stats.privileged > 0 {
        let _ = writeln!(
            out,
            "  VIP invites {} ({} valid)",
            stats.privileged, stats.privileged_valid
        );
    }
    if let Some(rate) = stats.claimable_rate() {
        let _ = writeln!(out, "  Claimable share of value {rate:.1}%");
    }
    if stats.total_value > 0.0 {
        let _ = writeln!(
            out,
            "  Gift value {:.2} total, {:.2} claimable",
            stats.total_value, stats.available_value
        );
    }
}

fn render_row(row: &ResultRowView) -> String {
    let label = match row.status {
        ResultStatus::Success => row.category.as_str(),
        ResultStatus::Error => "error",
    };
    let mut line = format!("{:<9} {}  {}", label, row.link, row.status_text);
    if let Some(gift_type) = &row.gift_type {
        let _ = write!(line, "  [{gift_type}");
        if let Some(price) = row.price {
            let _ = write!(line, " {price:.2}");
        }
        line.push(']');
    }
    if let Some(expire) = &row.expire_date {
        let _ = write!(line, "  expires {expire}");
    }
    line
}

#[cfg(test)]
mod tests {
    use giftcheck_core::{Attributes, ClassificationResult, Link, Statistics, SubmitStats};

    use super::*;

    fn row(result: &ClassificationResult) -> ResultRowView {
        ResultRowView::from(result)
    }

    #[test]
    fn row_shows_gift_details() {
        let link = Link::parse("http://163cn.tv/abc").unwrap();
        let result = ClassificationResult::success(&link, Category::Available, 0).with_attributes(
            Attributes {
                status_text: Some("claimable (2/3)".to_string()),
                gift_type: Some("VIP monthly card".to_string()),
                price: Some(15.0),
                ..Attributes::default()
            },
        );
        let line = render_row(&row(&result));
        assert!(line.starts_with("available"));
        assert!(line.contains("http://163cn.tv/abc"));
        assert!(line.contains("[VIP monthly card 15.00]"));
    }

    #[test]
    fn error_rows_are_labelled() {
        let link = Link::parse("http://163cn.tv/abc").unwrap();
        let result = ClassificationResult::error(&link, "timeout", 0);
        assert!(render_row(&row(&result)).starts_with("error"));
    }

    #[test]
    fn report_lists_nonzero_categories_only() {
        let link = Link::parse("http://163cn.tv/abc").unwrap();
        let results = [ClassificationResult::success(&link, Category::Claimed, 0)];
        let view = AppViewModel {
            statistics: Statistics::from_results(&results),
            link_count: 1,
            matching: 1,
            page: 1,
            total_pages: 1,
            rows: results.iter().map(ResultRowView::from).collect(),
            ..AppViewModel::default()
        };
        let text = render(&view);
        assert!(text.contains("claimed"));
        assert!(!text.contains("  expired"));
        assert!(text.contains("page 1/1"));
    }

    #[test]
    fn submit_line_mentions_requeued_links_only_when_present() {
        let mut view = AppViewModel {
            last_submit: Some(SubmitStats {
                accepted: 4,
                rejected: 1,
                skipped: 2,
                requeued: 0,
            }),
            ..AppViewModel::default()
        };
        let text = render(&view);
        assert!(text.contains("Submitted: 4 valid, 1 rejected, 2 skipped\n"));

        view.last_submit = view.last_submit.map(|submit| SubmitStats {
            requeued: 3,
            ..submit
        });
        assert!(render(&view).contains("2 skipped, 3 unchecked from earlier\n"));
    }
}
