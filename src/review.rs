//! Sequential navigation and change accounting over a [`Session`].
//!
//! Every operation takes the session explicitly. Navigation never fails: it
//! saturates at the table bounds and does nothing on an empty table. The
//! only fallible operation is writing an approval value.

use crate::error::ReviewError;
use crate::session::{Approval, Session};
use serde::{Deserialize, Serialize};

/// A single user interaction, applied with [`apply`]
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    First,
    Previous,
    Next,
    Last,
    /// 1-based row number, clamped into range
    JumpTo(i64),
    SetApproval(String),
}

impl Command {
    /// Parses the navigation command names used by the renderers
    pub fn navigation(name: &str) -> Option<Self> {
        match name {
            "first" => Some(Command::First),
            "previous" | "prev" => Some(Command::Previous),
            "next" => Some(Command::Next),
            "last" => Some(Command::Last),
            _ => None,
        }
    }
}

/// What a command did, for the renderer's status line
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Moved { position: usize },
    ApprovalUpdated(Approval),
    ApprovalUnchanged,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Summary {
    pub approved: usize,
    pub not_approved: usize,
    pub changed: usize,
}

/// Cursor position and which navigation controls are enabled
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub position: usize,
    pub row_count: usize,
    /// First and Previous
    pub can_go_back: bool,
    /// Next and Last
    pub can_go_forward: bool,
}

/// Clamp a 1-based row number into `[1, row_count]` and return it 0-based.
///
/// Returns 0 when the table is empty.
pub fn clamp_row_number(row: i64, row_count: usize) -> usize {
    if row_count == 0 {
        return 0;
    }
    let max = i64::try_from(row_count).unwrap_or(i64::MAX);
    (row.clamp(1, max) - 1) as usize
}

pub fn first(session: &mut Session) {
    session.set_cursor(0);
}

pub fn previous(session: &mut Session) {
    let position = session.cursor().saturating_sub(1);
    session.set_cursor(position);
}

pub fn next(session: &mut Session) {
    let last = session.row_count().saturating_sub(1);
    let position = (session.cursor() + 1).min(last);
    session.set_cursor(position);
}

pub fn last(session: &mut Session) {
    let position = session.row_count().saturating_sub(1);
    session.set_cursor(position);
}

pub fn jump_to(session: &mut Session, row: i64) {
    let position = clamp_row_number(row, session.row_count());
    session.set_cursor(position);
}

pub fn current_approval(session: &Session) -> Result<Approval, ReviewError> {
    session
        .approval_at(session.cursor())
        .map(Approval::from_cell)
}

/// Writes the approval of the current row; returns whether it changed
pub fn set_current_approval(session: &mut Session, value: &str) -> Result<bool, ReviewError> {
    session.set_approval(session.cursor(), value)
}

pub fn toggle_current_approval(session: &mut Session) -> Result<Approval, ReviewError> {
    let toggled = current_approval(session)?.toggled();
    set_current_approval(session, toggled.as_str())?;
    Ok(toggled)
}

/// Fraction of the table reached, `None` on an empty table
pub fn progress(session: &Session) -> Option<f64> {
    match session.row_count() {
        0 => None,
        rows => Some((session.cursor() + 1) as f64 / rows as f64),
    }
}

pub fn summary(session: &Session) -> Summary {
    let col = session.approval_column();
    let mut summary = Summary {
        changed: session.changed_count(),
        ..Summary::default()
    };
    for record in session.working().rows() {
        match record.get(col).and_then(|cell| cell.as_text()) {
            Some("yes") => summary.approved += 1,
            Some("no") => summary.not_approved += 1,
            _ => {}
        }
    }
    summary
}

pub fn navigation(session: &Session) -> Navigation {
    let row_count = session.row_count();
    let position = session.cursor();
    Navigation {
        position,
        row_count,
        can_go_back: position > 0,
        can_go_forward: position + 1 < row_count,
    }
}

/// Apply one command to the session
///
/// This is the mutate step of the renderer loop: the caller re-renders from
/// the session afterwards.
///
/// # Arguments
/// * `session` - The session to mutate
/// * `command` - The user's command
///
/// # Returns
/// * `Result<Outcome, ReviewError>` - Only `SetApproval` can fail
pub fn apply(session: &mut Session, command: Command) -> Result<Outcome, ReviewError> {
    match command {
        Command::First => first(session),
        Command::Previous => previous(session),
        Command::Next => next(session),
        Command::Last => last(session),
        Command::JumpTo(row) => jump_to(session, row),
        Command::SetApproval(value) => {
            return if set_current_approval(session, &value)? {
                Ok(Outcome::ApprovalUpdated(current_approval(session)?))
            } else {
                Ok(Outcome::ApprovalUnchanged)
            };
        }
    }
    Ok(Outcome::Moved {
        position: session.cursor(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Table};

    fn session_with_rows(rows: usize) -> Session {
        let rows = (0..rows)
            .map(|i| vec![CellValue::Number(i as f64)])
            .collect();
        Session::load(Table::new(vec!["id".into()], rows).unwrap())
    }

    #[test]
    fn test_boundaries_saturate() {
        let mut session = session_with_rows(5);
        first(&mut session);
        previous(&mut session);
        assert_eq!(session.cursor(), 0);

        last(&mut session);
        next(&mut session);
        assert_eq!(session.cursor(), 4);

        previous(&mut session);
        assert_eq!(session.cursor(), 3);
    }

    #[test]
    fn test_single_row_never_moves() {
        let mut session = session_with_rows(1);
        for command in [Command::First, Command::Previous, Command::Next, Command::Last] {
            apply(&mut session, command).unwrap();
            assert_eq!(session.cursor(), 0);
        }
        let nav = navigation(&session);
        assert!(!nav.can_go_back);
        assert!(!nav.can_go_forward);
    }

    #[test]
    fn test_jump_clamps() {
        let mut session = session_with_rows(10);
        jump_to(&mut session, 4);
        assert_eq!(session.cursor(), 3);
        jump_to(&mut session, 0);
        assert_eq!(session.cursor(), 0);
        jump_to(&mut session, -7);
        assert_eq!(session.cursor(), 0);
        jump_to(&mut session, 11);
        assert_eq!(session.cursor(), 9);
        jump_to(&mut session, i64::MAX);
        assert_eq!(session.cursor(), 9);
    }

    #[test]
    fn test_clamp_row_number() {
        assert_eq!(clamp_row_number(1, 3), 0);
        assert_eq!(clamp_row_number(3, 3), 2);
        assert_eq!(clamp_row_number(99, 3), 2);
        assert_eq!(clamp_row_number(-1, 3), 0);
        assert_eq!(clamp_row_number(5, 0), 0);
    }

    #[test]
    fn test_summary_scenario() {
        let mut session = session_with_rows(3);
        let expect = |approved, not_approved, changed| Summary {
            approved,
            not_approved,
            changed,
        };
        assert_eq!(summary(&session), expect(0, 3, 0));

        jump_to(&mut session, 2);
        let outcome = apply(&mut session, Command::SetApproval("yes".into())).unwrap();
        assert_eq!(outcome, Outcome::ApprovalUpdated(Approval::Yes));
        assert_eq!(summary(&session), expect(1, 2, 1));

        apply(&mut session, Command::SetApproval("no".into())).unwrap();
        assert_eq!(summary(&session), expect(0, 3, 0));
    }

    #[test]
    fn test_unchanged_write_is_reported() {
        let mut session = session_with_rows(2);
        let outcome = apply(&mut session, Command::SetApproval("no".into())).unwrap();
        assert_eq!(outcome, Outcome::ApprovalUnchanged);
    }

    #[test]
    fn test_invalid_value_leaves_table() {
        let mut session = session_with_rows(2);
        let before = session.working().clone();
        let result = apply(&mut session, Command::SetApproval("maybe".into()));
        assert!(matches!(result, Err(ReviewError::InvalidValue(_))));
        assert_eq!(session.working(), &before);
    }

    #[test]
    fn test_toggle() {
        let mut session = session_with_rows(2);
        assert_eq!(toggle_current_approval(&mut session).unwrap(), Approval::Yes);
        assert_eq!(current_approval(&session).unwrap(), Approval::Yes);
        assert_eq!(toggle_current_approval(&mut session).unwrap(), Approval::No);
        assert_eq!(summary(&session).changed, 0);
    }

    #[test]
    fn test_progress() {
        let mut session = session_with_rows(4);
        assert_eq!(progress(&session), Some(0.25));
        last(&mut session);
        assert_eq!(progress(&session), Some(1.0));
        assert_eq!(progress(&session_with_rows(0)), None);
    }

    #[test]
    fn test_empty_table_navigation_is_inert() {
        let mut session = session_with_rows(0);
        for command in [
            Command::First,
            Command::Previous,
            Command::Next,
            Command::Last,
            Command::JumpTo(3),
        ] {
            apply(&mut session, command).unwrap();
            assert_eq!(session.cursor(), 0);
        }
        assert!(current_approval(&session).is_err());
        assert_eq!(summary(&session), Summary::default());
    }

    #[test]
    fn test_navigation_flags() {
        let mut session = session_with_rows(3);
        let nav = navigation(&session);
        assert!(!nav.can_go_back && nav.can_go_forward);
        next(&mut session);
        let nav = navigation(&session);
        assert!(nav.can_go_back && nav.can_go_forward);
        last(&mut session);
        let nav = navigation(&session);
        assert!(nav.can_go_back && !nav.can_go_forward);
        assert_eq!(nav.position, 2);
        assert_eq!(nav.row_count, 3);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::navigation("prev"), Some(Command::Previous));
        assert_eq!(Command::navigation("last"), Some(Command::Last));
        assert_eq!(Command::navigation("sideways"), None);
    }
}
