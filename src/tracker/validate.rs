// tracker/validate.rs — Field-level validation.
//
// Policy: collect-all-then-report. Every rule that fails contributes a
// message keyed by its field; the caller turns a non-empty set into a
// single 400 response.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::storage::TaskRow;
use crate::tracker::TaskStatus;

/// Field name → messages, ordered by field for reproducible output.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, mut messages) in other.0 {
            self.0.entry(field).or_default().append(&mut messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Employee field rules. `full_name` allows letters plus the separators that
/// occur in real names (spaces, hyphens, apostrophes), and shares the
/// 3-character minimum used for task names.
pub fn validate_employee(full_name: &str, position: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if full_name.chars().count() < 3 {
        errors.add("full_name", "Full name must be at least 3 characters long.");
    }
    if !full_name.is_empty()
        && !full_name
            .chars()
            .all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'')
    {
        errors.add("full_name", "Full name must contain only letters.");
    }
    if position.chars().count() < 2 {
        errors.add("position", "Position must be at least 2 characters long.");
    }

    errors
}

/// Merged view of a task write (create, or update applied over the stored
/// row). `deadline_is_new` marks whether this request supplied the deadline;
/// the past-deadline rule only applies to newly supplied values, so a task
/// whose stored deadline has already passed stays updatable.
pub struct TaskFields<'a> {
    pub name: &'a str,
    pub deadline: Option<NaiveDate>,
    pub deadline_is_new: bool,
    pub status: &'a str,
    pub parent_deadline: Option<NaiveDate>,
}

pub fn validate_task(fields: &TaskFields<'_>, today: NaiveDate) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if fields.name.chars().count() < 3 {
        errors.add("name", "Task name must be at least 3 characters long.");
    }

    if TaskStatus::parse(fields.status).is_none() {
        errors.add("status", "Invalid status.");
    }

    if let Some(deadline) = fields.deadline {
        if fields.deadline_is_new && deadline < today {
            errors.add("deadline", "Deadline cannot be in the past.");
        }
        if let Some(parent_deadline) = fields.parent_deadline {
            if deadline > parent_deadline {
                errors.add(
                    "deadline",
                    "Task deadline cannot be later than the parent task deadline.",
                );
            }
        }
    }

    errors
}

/// Would re-parenting `task_id` under `new_parent` close a loop?
///
/// Walks the parent chain upward from `new_parent`. The visited set also
/// stops the walk if a bad row already on disk forms a loop that does not
/// include `task_id`.
pub fn creates_cycle(task_id: i64, new_parent: i64, tasks: &[TaskRow]) -> bool {
    let by_id: BTreeMap<i64, &TaskRow> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut visited = std::collections::BTreeSet::new();
    let mut current = Some(new_parent);
    while let Some(id) = current {
        if id == task_id {
            return true;
        }
        if !visited.insert(id) {
            return false;
        }
        current = by_id.get(&id).and_then(|t| t.parent_task);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_task;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn employee_rules_collect_all_failures() {
        let errors = validate_employee("J5", "D");
        assert_eq!(errors.0.len(), 2);
        assert_eq!(
            errors.0["full_name"],
            vec![
                "Full name must be at least 3 characters long.",
                "Full name must contain only letters.",
            ]
        );
        assert_eq!(
            errors.0["position"],
            vec!["Position must be at least 2 characters long."]
        );
    }

    #[test]
    fn employee_names_allow_spaces_and_hyphens() {
        assert!(validate_employee("Mary-Jane O'Neil", "Developer").is_empty());
        assert!(!validate_employee("R2D2", "Droid").is_empty());
    }

    #[test]
    fn task_name_and_status_rules() {
        let fields = TaskFields {
            name: "Ta",
            deadline: Some(date("2099-01-01")),
            deadline_is_new: true,
            status: "Paused",
            parent_deadline: None,
        };
        let errors = validate_task(&fields, date("2026-01-01"));
        assert_eq!(errors.0["name"], vec!["Task name must be at least 3 characters long."]);
        assert_eq!(errors.0["status"], vec!["Invalid status."]);
    }

    #[test]
    fn past_deadline_rejected_only_when_newly_supplied() {
        let today = date("2026-06-01");
        let mut fields = TaskFields {
            name: "Ship it",
            deadline: Some(date("2026-05-01")),
            deadline_is_new: true,
            status: "Not Started",
            parent_deadline: None,
        };
        assert_eq!(
            validate_task(&fields, today).0["deadline"],
            vec!["Deadline cannot be in the past."]
        );

        // Same stored value merged into an update that did not touch it.
        fields.deadline_is_new = false;
        assert!(validate_task(&fields, today).is_empty());
    }

    #[test]
    fn deadline_must_not_exceed_parent_deadline() {
        let fields = TaskFields {
            name: "Subtask",
            deadline: Some(date("2026-09-01")),
            deadline_is_new: true,
            status: "Not Started",
            parent_deadline: Some(date("2026-08-01")),
        };
        let errors = validate_task(&fields, date("2026-01-01"));
        assert_eq!(
            errors.0["deadline"],
            vec!["Task deadline cannot be later than the parent task deadline."]
        );

        // Equal deadlines are allowed.
        let fields = TaskFields {
            deadline: Some(date("2026-08-01")),
            ..fields
        };
        assert!(validate_task(&fields, date("2026-01-01")).is_empty());
    }

    #[test]
    fn reparenting_under_a_descendant_is_a_cycle() {
        // 1 ← 2 ← 3 (parent links point left)
        let tasks = vec![
            test_task(1, None, None, "2026-12-31", "Not Started"),
            test_task(2, Some(1), None, "2026-12-31", "Not Started"),
            test_task(3, Some(2), None, "2026-12-31", "Not Started"),
        ];
        assert!(creates_cycle(1, 3, &tasks), "1 under its grandchild");
        assert!(creates_cycle(1, 1, &tasks), "self-parent");
        assert!(!creates_cycle(3, 1, &tasks), "deeper nesting is fine");
    }

    #[test]
    fn cycle_walk_survives_a_corrupt_loop_on_disk() {
        // 10 ⇄ 11 already loop without involving task 5.
        let tasks = vec![
            test_task(10, Some(11), None, "2026-12-31", "Not Started"),
            test_task(11, Some(10), None, "2026-12-31", "Not Started"),
        ];
        assert!(!creates_cycle(5, 10, &tasks));
    }
}
