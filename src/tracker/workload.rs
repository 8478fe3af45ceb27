// tracker/workload.rs — Workload aggregation and staffing heuristics.
//
// Pure functions over in-memory row slices: the callers (REST report
// handlers) read a per-request snapshot from storage and feed it in whole.
// No cross-request atomicity is provided — two concurrent assignment
// requests can observe the same baseline load and pick the same employee.

use std::collections::{BTreeMap, BTreeSet};

use crate::storage::{EmployeeRow, TaskRow};
use crate::tracker::is_active_status;

/// An employee stays eligible while carrying at most this many active tasks
/// above the least-loaded employee.
pub const LOAD_SLACK: usize = 2;

/// Active-task count per employee, keyed by ascending employee id.
/// Every employee appears, including those with zero active tasks.
pub fn active_task_counts(
    employees: &[EmployeeRow],
    tasks: &[TaskRow],
) -> BTreeMap<i64, usize> {
    let mut counts: BTreeMap<i64, usize> =
        employees.iter().map(|e| (e.id, 0)).collect();
    for task in tasks {
        if let Some(assignee) = task.assignee {
            if is_active_status(&task.status) {
                if let Some(count) = counts.get_mut(&assignee) {
                    *count += 1;
                }
            }
        }
    }
    counts
}

/// Minimum active-task count across all employees. Zero when there are none.
pub fn baseline_load(counts: &BTreeMap<i64, usize>) -> usize {
    counts.values().copied().min().unwrap_or(0)
}

/// Task ids on `task`'s hierarchy line: all ancestors via parent links plus
/// the whole subtask tree below it, and the task itself. Both walks carry a
/// visited set so a corrupt parent loop on disk cannot hang the traversal.
pub fn chain_task_ids(task: &TaskRow, tasks: &[TaskRow]) -> BTreeSet<i64> {
    let by_id: BTreeMap<i64, &TaskRow> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut children: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for t in tasks {
        if let Some(parent) = t.parent_task {
            children.entry(parent).or_default().push(t.id);
        }
    }

    let mut chain = BTreeSet::new();
    chain.insert(task.id);

    // Ancestors.
    let mut current = task.parent_task;
    while let Some(id) = current {
        if !chain.insert(id) {
            break;
        }
        current = by_id.get(&id).and_then(|t| t.parent_task);
    }

    // Descendants, breadth-first.
    let mut queue = vec![task.id];
    while let Some(id) = queue.pop() {
        for &child in children.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            if chain.insert(child) {
                queue.push(child);
            }
        }
    }

    chain
}

/// Employees eligible to take `task`: active load within `LOAD_SLACK` of the
/// baseline, or already working a task on the same parent/subtask chain
/// (continuity preference). Ordered by ascending employee id; an empty
/// employee set yields an empty result.
pub fn candidates<'a>(
    task: &TaskRow,
    employees: &'a [EmployeeRow],
    tasks: &[TaskRow],
) -> Vec<&'a EmployeeRow> {
    if employees.is_empty() {
        return Vec::new();
    }

    let counts = active_task_counts(employees, tasks);
    let baseline = baseline_load(&counts);
    let chain = chain_task_ids(task, tasks);

    let mut on_chain: BTreeSet<i64> = BTreeSet::new();
    for t in tasks {
        if let Some(assignee) = t.assignee {
            if chain.contains(&t.id) {
                on_chain.insert(assignee);
            }
        }
    }

    let mut eligible: Vec<&EmployeeRow> = employees
        .iter()
        .filter(|e| {
            counts.get(&e.id).copied().unwrap_or(0) <= baseline + LOAD_SLACK
                || on_chain.contains(&e.id)
        })
        .collect();
    eligible.sort_by_key(|e| e.id);
    eligible
}

/// Tasks needing urgent staffing: unassigned, or not yet started while their
/// parent is already in progress (they block downstream work). Ordered by
/// deadline ascending, id ascending on ties. Completed tasks never qualify
/// on the parent rule.
pub fn important_tasks<'a>(tasks: &'a [TaskRow]) -> Vec<&'a TaskRow> {
    let by_id: BTreeMap<i64, &TaskRow> = tasks.iter().map(|t| (t.id, t)).collect();

    let mut important: Vec<&TaskRow> = tasks
        .iter()
        .filter(|t| {
            if t.assignee.is_none() {
                return true;
            }
            t.status == "Not Started"
                && t.parent_task
                    .and_then(|p| by_id.get(&p))
                    .is_some_and(|parent| parent.status == "In Progress")
        })
        .collect();

    // Deadlines are ISO dates, so string order is date order.
    important.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
    important
}

/// Busy report: every employee with their active tasks, ranked by active
/// count descending, then earliest active deadline, then id.
pub fn busy_report<'a>(
    employees: &'a [EmployeeRow],
    tasks: &'a [TaskRow],
) -> Vec<(&'a EmployeeRow, Vec<&'a TaskRow>)> {
    let mut report: Vec<(&EmployeeRow, Vec<&TaskRow>)> = employees
        .iter()
        .map(|e| {
            let mut active: Vec<&TaskRow> = tasks
                .iter()
                .filter(|t| t.assignee == Some(e.id) && is_active_status(&t.status))
                .collect();
            active.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
            (e, active)
        })
        .collect();

    report.sort_by(|(ea, ta), (eb, tb)| {
        tb.len()
            .cmp(&ta.len())
            .then_with(|| {
                let ea_first = ta.first().map(|t| t.deadline.as_str());
                let eb_first = tb.first().map(|t| t.deadline.as_str());
                ea_first.cmp(&eb_first)
            })
            .then(ea.id.cmp(&eb.id))
    });
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{test_employee, test_task};

    #[test]
    fn counts_cover_every_employee_and_skip_completed() {
        let employees = vec![test_employee(1, "Ann"), test_employee(2, "Bob")];
        let tasks = vec![
            test_task(1, None, Some(1), "2026-12-01", "In Progress"),
            test_task(2, None, Some(1), "2026-12-02", "Completed"),
            test_task(3, None, Some(1), "2026-12-03", "Not Started"),
        ];
        let counts = active_task_counts(&employees, &tasks);
        assert_eq!(counts[&1], 2);
        assert_eq!(counts[&2], 0);
        assert_eq!(baseline_load(&counts), 0);
    }

    #[test]
    fn baseline_is_zero_without_employees() {
        let counts = active_task_counts(&[], &[]);
        assert_eq!(baseline_load(&counts), 0);
    }

    #[test]
    fn chain_spans_ancestors_and_subtask_tree() {
        // 1 ← 2 ← 3, plus 4 under 2 and an unrelated 9.
        let tasks = vec![
            test_task(1, None, None, "2026-12-31", "In Progress"),
            test_task(2, Some(1), None, "2026-12-31", "Not Started"),
            test_task(3, Some(2), None, "2026-12-31", "Not Started"),
            test_task(4, Some(2), None, "2026-12-31", "Not Started"),
            test_task(9, None, None, "2026-12-31", "Not Started"),
        ];
        let chain = chain_task_ids(&tasks[1], &tasks);
        assert_eq!(chain.into_iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn slack_rule_admits_up_to_baseline_plus_two() {
        // A:0, B:1, C:3 → baseline 0, C over the slack line.
        let employees = vec![
            test_employee(1, "A"),
            test_employee(2, "B"),
            test_employee(3, "C"),
        ];
        let mut tasks = vec![test_task(10, None, Some(2), "2026-12-01", "In Progress")];
        for id in 11..14 {
            tasks.push(test_task(id, None, Some(3), "2026-12-01", "In Progress"));
        }
        let target = test_task(99, None, None, "2026-12-31", "Not Started");

        let picked = candidates(&target, &employees, &tasks);
        let ids: Vec<i64> = picked.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn continuity_overrides_the_load_comparison() {
        // C is overloaded but works the target's parent task.
        let employees = vec![test_employee(1, "A"), test_employee(3, "C")];
        let mut tasks = vec![
            test_task(1, None, Some(3), "2026-12-01", "In Progress"),
            test_task(2, Some(1), None, "2026-11-01", "Not Started"),
        ];
        for id in 11..14 {
            tasks.push(test_task(id, None, Some(3), "2026-12-01", "In Progress"));
        }
        let target = tasks[1].clone();

        let picked = candidates(&target, &employees, &tasks);
        let ids: Vec<i64> = picked.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn no_employees_means_no_candidates() {
        let target = test_task(1, None, None, "2026-12-31", "Not Started");
        assert!(candidates(&target, &[], &[]).is_empty());
    }

    #[test]
    fn important_covers_unassigned_and_blocked_not_completed() {
        let tasks = vec![
            // Unassigned → important regardless of status.
            test_task(1, None, None, "2026-12-05", "In Progress"),
            // Assigned, parent in progress, not started → blocking.
            test_task(2, Some(1), Some(7), "2026-12-01", "Not Started"),
            // Completed under an in-progress parent → never important.
            test_task(3, Some(1), Some(7), "2026-12-02", "Completed"),
            // Assigned, parent not started → fine.
            test_task(4, Some(2), Some(7), "2026-12-03", "In Progress"),
        ];
        let ids: Vec<i64> = important_tasks(&tasks).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1], "deadline ascending");
    }

    #[test]
    fn busy_report_ranks_by_count_then_earliest_deadline() {
        let employees = vec![
            test_employee(1, "Zero"),
            test_employee(2, "Three"),
            test_employee(3, "One"),
            test_employee(4, "AlsoThree"),
        ];
        let mut tasks = vec![test_task(1, None, Some(3), "2026-12-01", "In Progress")];
        for id in 2..5 {
            tasks.push(test_task(id, None, Some(2), "2026-10-01", "Not Started"));
        }
        for id in 5..8 {
            // Same count as employee 2, but earlier first deadline.
            tasks.push(test_task(id, None, Some(4), "2026-09-01", "Not Started"));
        }

        let report = busy_report(&employees, &tasks);
        let order: Vec<i64> = report.iter().map(|(e, _)| e.id).collect();
        assert_eq!(order, vec![4, 2, 3, 1]);
        assert_eq!(report[0].1.len(), 3);
        assert_eq!(report[3].1.len(), 0);
    }
}
