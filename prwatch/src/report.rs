//! Line-oriented terminal reporter.
//!
//! Every poll prints one status line, followed by any degradation (`!`) and
//! anomaly (`?`) lines and then the poll's notifications. Output keeps
//! scrolling in the normal screen buffer; nothing is redrawn in place.

use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use crossterm::queue;
use crossterm::style::{Color, ContentStyle, Print, StyledContent, Stylize};
use prwatch_core::merge_queue::QueueTransition;
use prwatch_core::{Issue, Notification, PollSnapshot, WatchError, WatchObserver};

use crate::keybindings::HELP;

/// Longest body excerpt printed on a one-line issue summary.
const SUMMARY_WIDTH: usize = 72;

pub struct Reporter<W: Write> {
    out: W,
    /// Raw mode is on, so lines must end in `\r\n`.
    raw: bool,
    color: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, raw: bool, color: bool) -> Self {
        Self { out, raw, color }
    }

    fn paint<D: Display>(&self, text: D, color: Color) -> StyledContent<D> {
        let style = if self.color {
            ContentStyle::new().with(color)
        } else {
            ContentStyle::new()
        };
        style.apply(text)
    }

    fn newline(&self) -> &'static str {
        if self.raw {
            "\r\n"
        } else {
            "\n"
        }
    }

    fn line(&mut self, text: impl Display) -> io::Result<()> {
        let nl = self.newline();
        queue!(self.out, Print(text), Print(nl))
    }

    fn painted(&mut self, text: impl Display, color: Color) -> io::Result<()> {
        let styled = self.paint(text, color);
        self.line(styled)
    }

    fn flush_or_log(&mut self, result: io::Result<()>) {
        if let Err(e) = result.and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write report");
        }
    }

    pub fn banner(&mut self, source: &Path, every: Duration, interactive: bool) {
        let result = self.write_banner(source, every, interactive);
        self.flush_or_log(result);
    }

    fn write_banner(&mut self, source: &Path, every: Duration, interactive: bool) -> io::Result<()> {
        self.painted(
            format!(
                "prwatch: watching {} every {}s",
                source.display(),
                every.as_secs()
            ),
            Color::Cyan,
        )?;
        if interactive {
            self.line(HELP)?;
        }
        Ok(())
    }

    pub fn help(&mut self) {
        let result = self.line(HELP);
        self.flush_or_log(result);
    }

    /// Prints the active issues with the indices the digit keys select.
    pub fn list_issues(&mut self, snapshot: Option<&PollSnapshot>) {
        let result = match snapshot {
            None => self.line("no poll has completed yet"),
            Some(s) => self.write_issue_list(&s.active_issues),
        };
        self.flush_or_log(result);
    }

    fn write_issue_list(&mut self, issues: &[Issue]) -> io::Result<()> {
        if issues.is_empty() {
            return self.painted("no active issues", Color::Green);
        }
        for (index, issue) in issues.iter().enumerate() {
            self.write_issue_summary(Some(index), issue)?;
        }
        Ok(())
    }

    fn write_issue_summary(&mut self, index: Option<usize>, issue: &Issue) -> io::Result<()> {
        let marker = match index {
            Some(i) if i < 9 => format!("{}.", i + 1),
            _ => " -".to_owned(),
        };
        let mut head = format!("  {marker} [{}]", issue.kind.label());
        if let Some(origin) = issue.origin() {
            head.push_str(&format!(" {origin}"));
        }
        if let Some(location) = issue.location() {
            head.push_str(&format!(" {location}"));
        }
        let color = if issue.blocking {
            Color::Red
        } else {
            Color::DarkYellow
        };
        let head = self.paint(head, color);
        let nl = self.newline();
        queue!(
            self.out,
            Print(head),
            Print(" "),
            Print(issue.summary(SUMMARY_WIDTH)),
            Print(nl)
        )
    }

    /// Prints everything known about the active issue at `index`.
    pub fn show_issue(&mut self, index: usize, issue: Option<&Issue>) {
        let result = match issue {
            None => self.line(format!("no active issue #{}", index + 1)),
            Some(issue) => self.write_issue_detail(issue),
        };
        self.flush_or_log(result);
    }

    fn write_issue_detail(&mut self, issue: &Issue) -> io::Result<()> {
        self.painted(format!("{}", issue.id), Color::Cyan)?;
        if let Some(location) = issue.location() {
            self.line(format!("  at {location}"))?;
        }
        if let Some(created) = issue.created_at {
            let local = created.with_timezone(&chrono::Local);
            self.line(format!("  opened {}", local.format("%Y-%m-%d %H:%M")))?;
        }
        if !issue.blocking {
            self.line("  non-blocking")?;
        }
        if !issue.url.is_empty() {
            self.line(format!("  {}", issue.url))?;
        }
        for body_line in issue.body.lines() {
            self.line(format!("    {body_line}"))?;
        }
        Ok(())
    }

    /// Reports a fatal watch error just before the loop ends.
    pub fn fatal(&mut self, error: &WatchError) {
        let result = self.painted(format!("prwatch: {error}"), Color::Red);
        self.flush_or_log(result);
    }

    fn write_snapshot(&mut self, snapshot: &PollSnapshot) -> io::Result<()> {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        let blocking = snapshot.blocking_count();
        let issues = format!(
            "{blocking} blocking / {} active",
            snapshot.active_issues.len()
        );
        let issues = self.paint(issues, if blocking > 0 { Color::Red } else { Color::Green });
        let ci_color = if snapshot.ci.failed_blocking > 0 {
            Color::Red
        } else if snapshot.ci.all_green {
            Color::Green
        } else {
            Color::Yellow
        };
        let ci = self.paint(snapshot.ci.to_string(), ci_color);
        let label = if snapshot.is_first_poll {
            "baseline".to_owned()
        } else {
            format!("poll {}", snapshot.poll)
        };
        let nl = self.newline();
        queue!(
            self.out,
            Print(format!("[{stamp}] {label}  ")),
            Print(issues),
            Print("  "),
            Print(ci),
            Print(format!("  queue: {}", snapshot.queue_display())),
            Print(nl)
        )?;

        for degradation in &snapshot.degraded {
            self.painted(format!("  ! {degradation}"), Color::Yellow)?;
        }
        for anomaly in &snapshot.anomalies {
            self.painted(format!("  ? {anomaly}"), Color::DarkGrey)?;
        }
        if snapshot.is_first_poll {
            return self.write_issue_list(&snapshot.active_issues);
        }
        for issue in snapshot.new_issues.iter().filter(|i| !i.blocking) {
            self.write_non_blocking(issue)?;
        }
        Ok(())
    }

    /// New non-blocking issues never notify; they get one dimmed line.
    fn write_non_blocking(&mut self, issue: &Issue) -> io::Result<()> {
        let text = format!(
            "  ~ new non-blocking [{}] {}",
            issue.kind.label(),
            issue.summary(SUMMARY_WIDTH)
        );
        self.painted(text, Color::DarkGrey)
    }

    fn write_notification(&mut self, notification: &Notification) -> io::Result<()> {
        match notification {
            Notification::NewIssues(issues) => {
                let noun = if issues.len() == 1 { "issue" } else { "issues" };
                self.painted(
                    format!("  >> {} new blocking {noun}", issues.len()),
                    Color::Red,
                )?;
                for issue in issues {
                    self.write_issue_summary(None, issue)?;
                }
                Ok(())
            }
            Notification::ReadyToMerge => {
                queue!(self.out, Print("\x07"))?;
                self.painted("  >> ready to merge: nothing blocking, CI green", Color::Green)
            }
            Notification::QueueTransition(transition) => {
                let color = match transition {
                    QueueTransition::Removed { .. } => Color::Red,
                    QueueTransition::Merged => Color::Green,
                    QueueTransition::Added { .. } => Color::Cyan,
                };
                self.painted(format!("  >> {transition}"), color)
            }
        }
    }
}

impl<W: Write> WatchObserver for Reporter<W> {
    fn on_poll_result(&mut self, snapshot: &PollSnapshot) {
        let result = self.write_snapshot(snapshot);
        self.flush_or_log(result);
    }

    fn on_notify(&mut self, notification: &Notification) {
        let result = self.write_notification(notification);
        self.flush_or_log(result);
    }
}
