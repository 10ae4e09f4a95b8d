//! Plain-text rendering for terminal output.

use std::fmt::Write as _;

use crate::api::types::{BranchList, PullPreview};
use crate::monitor::{Panel, Snapshot};
use crate::workflow::types::{DialogKind, PullOutcome};

/// Longest file list printed before eliding the rest.
const MAX_LISTED: usize = 20;

fn push_list(out: &mut String, items: &[String]) {
    for item in items.iter().take(MAX_LISTED) {
        let _ = writeln!(out, "  - {item}");
    }
    if items.len() > MAX_LISTED {
        let _ = writeln!(out, "  ... and {} more", items.len() - MAX_LISTED);
    }
}

pub fn render_dialog(kind: DialogKind, items: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n== {} ({}) ==", kind.title(), items.len());
    match kind {
        DialogKind::SqlMigrations => {
            out.push_str("Apply these migrations before building or restarting:\n");
        }
        DialogKind::BuildDashboardChanges => {
            out.push_str("The build dashboard changed; rebuild it to pick these up:\n");
        }
    }
    push_list(&mut out, items);
    out
}

pub fn render_pull_outcome(outcome: &PullOutcome) -> String {
    let mut out = String::new();
    match outcome {
        PullOutcome::Completed(result) => {
            let _ = writeln!(out, "{}", result.message);
            if !result.changes.is_empty() {
                let _ = writeln!(out, "Changed files ({}):", result.changes.len());
                push_list(&mut out, &result.changes);
            }
        }
        PullOutcome::Failed(failure) => {
            let _ = writeln!(out, "Pull failed: {}", failure.message);
            if !failure.conflicts.is_empty() {
                out.push_str("Conflicts:\n");
                push_list(&mut out, &failure.conflicts);
            }
            if !failure.changes.is_empty() {
                out.push_str("Local changes:\n");
                push_list(&mut out, &failure.changes);
            }
        }
    }
    out
}

pub fn render_branches(branches: &BranchList) -> String {
    let mut out = String::new();
    let current = branches.current.as_deref().unwrap_or("-");
    let _ = writeln!(out, "Current: {current}");
    out.push_str("Local:\n");
    for branch in &branches.local {
        let marker = if Some(branch.as_str()) == branches.current.as_deref() {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(out, " {marker} {branch}");
    }
    out.push_str("Remote (origin):\n");
    for branch in &branches.remote {
        let _ = writeln!(out, "   {branch}");
    }
    out
}

pub fn render_preview(preview: &PullPreview) -> String {
    let mut out = String::new();
    if let Some(error) = &preview.error {
        let _ = writeln!(out, "Preview failed: {error}");
        return out;
    }
    if !preview.has_changes {
        let _ = writeln!(
            out,
            "{}",
            preview.message.as_deref().unwrap_or("Already up to date")
        );
        return out;
    }

    let branch = preview.branch.as_deref().unwrap_or("current branch");
    let _ = writeln!(
        out,
        "{} incoming commit(s), {} file(s) on {branch}",
        preview.commits.len(),
        preview.files.len()
    );
    for commit in preview.commits.iter().take(MAX_LISTED) {
        let short = commit.hash.get(..7).unwrap_or(&commit.hash);
        let _ = writeln!(out, "  {short} {}", commit.message);
    }
    if !preview.buildmaster_files.is_empty() {
        out.push_str("Build dashboard files:\n");
        push_list(&mut out, &preview.buildmaster_files);
    }
    out
}

fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}

pub fn render_snapshot(snap: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "[{}] env={}",
        snap.taken_at.format("%Y-%m-%d %H:%M:%S"),
        snap.env
    );

    match &snap.working_tree {
        Panel::Ready(s) => {
            let state = if s.clean { "clean" } else { "dirty" };
            let _ = writeln!(
                out,
                "Working tree: {} ({state}, ahead {}, behind {}) modified {} added {} deleted {} untracked {}",
                s.branch,
                s.ahead,
                s.behind,
                s.modified.len(),
                s.added.len(),
                s.deleted.len(),
                s.untracked.len()
            );
        }
        Panel::Unavailable(e) => {
            let _ = writeln!(out, "Working tree: unavailable ({e})");
        }
    }

    match &snap.health {
        Panel::Ready(h) => {
            let uptime = h.uptime.map(format_uptime).unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "Server: up {uptime}, cpu {:.1}% of {} cores, mem {:.1}% ({}/{} MB), disk {:.1}% ({:.1} GB free)",
                h.cpu.percent,
                h.cpu.cores,
                h.memory.percent,
                h.memory.used_mb,
                h.memory.total_mb,
                h.disk.percent,
                h.disk.free_gb
            );
            if let Some(db) = &h.database {
                let status = db.status.as_deref().unwrap_or("unknown");
                match db.error.as_deref().or(db.message.as_deref()) {
                    Some(detail) => {
                        let _ = writeln!(out, "Database: {status} ({detail})");
                    }
                    None => {
                        let _ = writeln!(out, "Database: {status}");
                    }
                }
            }
        }
        Panel::Unavailable(e) => {
            let _ = writeln!(out, "Server: unavailable ({e})");
        }
    }

    match &snap.env_git {
        Panel::Ready(g) => {
            let short = g.commit.get(..8).unwrap_or(&g.commit);
            let changes = if g.has_changes { ", local changes" } else { "" };
            let updated = g.last_update.as_deref().unwrap_or("-");
            let _ = writeln!(
                out,
                "Deployed: {} @ {short}{changes} (updated {updated})",
                g.branch
            );
        }
        Panel::Unavailable(e) => {
            let _ = writeln!(out, "Deployed: unavailable ({e})");
        }
    }

    match &snap.build {
        Panel::Ready(b) => {
            let _ = write!(out, "Build: {}", b.status);
            if let Some(progress) = b.progress {
                let _ = write!(out, " {progress:.0}%");
            }
            if let Some(step) = &b.current_step {
                let _ = write!(out, " ({step})");
            }
            if let Some(error) = &b.error {
                let _ = write!(out, " error: {error}");
            }
            out.push('\n');
        }
        Panel::Unavailable(e) => {
            let _ = writeln!(out, "Build: unavailable ({e})");
        }
    }

    out
}
