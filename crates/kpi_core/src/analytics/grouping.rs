//! Dashboard grouping of indicators by macroprocess and process.
//!
//! # Invariants
//! - Groups are keyed by display *name*, not id; two macroprocesses sharing
//!   a name merge into one group.
//! - Every level keeps first-seen order from the input.
//! - Indicators without a process or macroprocess land in placeholder groups.

use crate::model::catalog::{
    IndicatorCategory, IndicatorId, IndicatorWithAncestry, MacroprocessId, ProcessId,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const UNASSIGNED_MACROPROCESS: &str = "No macroprocess";
pub const UNASSIGNED_PROCESS: &str = "No process";

/// Macroprocess identity shown on a group header. `id` is 0 for the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroprocessHeader {
    pub id: MacroprocessId,
    pub name: String,
    pub color: Option<String>,
}

/// Process identity shown on a sub-group header. `id` is 0 for the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHeader {
    pub id: ProcessId,
    pub name: String,
}

/// Indicator card rendered inside a process group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorCard {
    pub id: IndicatorId,
    pub code: String,
    pub name: String,
    pub formula: String,
    pub unit: String,
    pub frequency: String,
    pub category: IndicatorCategory,
    pub target: Option<String>,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessGroup {
    pub process: ProcessHeader,
    pub indicators: Vec<IndicatorCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroprocessGroup {
    pub macroprocess: MacroprocessHeader,
    pub processes: Vec<ProcessGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: IndicatorCategory,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroprocessCount {
    pub macroprocess: String,
    pub count: usize,
}

/// Catalog tallies for the dashboard header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorTally {
    pub total: usize,
    /// Categories with at least one indicator, in declaration order.
    pub by_category: Vec<CategoryCount>,
    /// Sorted by macroprocess name; indicators without one are skipped.
    pub by_macroprocess: Vec<MacroprocessCount>,
}

/// Folds an ordered indicator list into macroprocess -> process groups.
pub fn group_indicators(items: &[IndicatorWithAncestry]) -> Vec<MacroprocessGroup> {
    let mut groups: Vec<MacroprocessGroup> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut process_index: Vec<HashMap<String, usize>> = Vec::new();

    for item in items {
        let macro_name = item
            .macroprocess_name()
            .unwrap_or(UNASSIGNED_MACROPROCESS)
            .to_string();
        let process_name = item.process_name().unwrap_or(UNASSIGNED_PROCESS).to_string();

        let group_slot = *group_index.entry(macro_name.clone()).or_insert_with(|| {
            groups.push(MacroprocessGroup {
                macroprocess: MacroprocessHeader {
                    id: item.macroprocess.as_ref().map_or(0, |m| m.id),
                    name: macro_name.clone(),
                    color: item.macroprocess.as_ref().and_then(|m| m.color.clone()),
                },
                processes: Vec::new(),
            });
            process_index.push(HashMap::new());
            groups.len() - 1
        });

        let group = &mut groups[group_slot];
        let process_slot = *process_index[group_slot]
            .entry(process_name.clone())
            .or_insert_with(|| {
                group.processes.push(ProcessGroup {
                    process: ProcessHeader {
                        id: item.process.as_ref().map_or(0, |p| p.id),
                        name: process_name,
                    },
                    indicators: Vec::new(),
                });
                group.processes.len() - 1
            });

        group.processes[process_slot]
            .indicators
            .push(indicator_card(item));
    }

    groups
}

/// Counts indicators overall, per category and per macroprocess name.
pub fn tally_indicators(items: &[IndicatorWithAncestry]) -> IndicatorTally {
    let mut per_category: HashMap<IndicatorCategory, usize> = HashMap::new();
    let mut per_macroprocess: BTreeMap<String, usize> = BTreeMap::new();

    for item in items {
        *per_category.entry(item.indicator.category).or_default() += 1;
        if let Some(name) = item.macroprocess_name() {
            *per_macroprocess.entry(name.to_string()).or_default() += 1;
        }
    }

    IndicatorTally {
        total: items.len(),
        by_category: IndicatorCategory::ALL
            .into_iter()
            .filter_map(|category| {
                per_category
                    .get(&category)
                    .map(|count| CategoryCount {
                        category,
                        count: *count,
                    })
            })
            .collect(),
        by_macroprocess: per_macroprocess
            .into_iter()
            .map(|(macroprocess, count)| MacroprocessCount {
                macroprocess,
                count,
            })
            .collect(),
    }
}

fn indicator_card(item: &IndicatorWithAncestry) -> IndicatorCard {
    let indicator = &item.indicator;
    IndicatorCard {
        id: indicator.id,
        code: indicator.code.clone(),
        name: indicator.name.clone(),
        formula: indicator.formula.clone(),
        unit: indicator.unit.clone(),
        frequency: indicator.frequency.clone(),
        category: indicator.category,
        target: indicator.target.clone(),
        owner: indicator.owner.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{group_indicators, tally_indicators, UNASSIGNED_MACROPROCESS};
    use crate::model::catalog::{
        Indicator, IndicatorCategory, IndicatorWithAncestry, Macroprocess, Process,
    };

    fn macroprocess(id: i64, name: &str) -> Macroprocess {
        Macroprocess {
            id,
            code: format!("M{id}"),
            name: name.to_string(),
            color: Some("#112233".to_string()),
            icon: None,
            display_order: id,
            is_active: true,
        }
    }

    fn process(id: i64, name: &str, macroprocess_id: i64) -> Process {
        Process {
            id,
            code: format!("P{id}"),
            name: name.to_string(),
            macroprocess_id: Some(macroprocess_id),
            owner: None,
            description: None,
            display_order: id,
            is_active: true,
        }
    }

    fn item(
        id: i64,
        category: IndicatorCategory,
        process: Option<Process>,
        macroprocess: Option<Macroprocess>,
    ) -> IndicatorWithAncestry {
        IndicatorWithAncestry {
            indicator: Indicator {
                id,
                code: format!("IND-{id}"),
                process_id: process.as_ref().map(|p| p.id),
                name: format!("indicator {id}"),
                formula: String::new(),
                unit: "%".to_string(),
                frequency: "monthly".to_string(),
                category,
                target: None,
                owner: "owner".to_string(),
                description: None,
                display_order: id,
                is_active: true,
            },
            process,
            macroprocess,
        }
    }

    #[test]
    fn grouping_keeps_first_seen_order_at_every_level() {
        let strategic = macroprocess(2, "Strategic");
        let support = macroprocess(1, "Support");
        let items = vec![
            item(
                1,
                IndicatorCategory::Efficacy,
                Some(process(10, "Planning", 2)),
                Some(strategic.clone()),
            ),
            item(
                2,
                IndicatorCategory::Quality,
                Some(process(11, "Purchasing", 1)),
                Some(support.clone()),
            ),
            item(
                3,
                IndicatorCategory::Efficacy,
                Some(process(12, "Audit", 2)),
                Some(strategic.clone()),
            ),
            item(
                4,
                IndicatorCategory::Efficiency,
                Some(process(10, "Planning", 2)),
                Some(strategic),
            ),
        ];

        let groups = group_indicators(&items);
        let names: Vec<&str> = groups.iter().map(|g| g.macroprocess.name.as_str()).collect();
        assert_eq!(names, vec!["Strategic", "Support"]);

        let strategic_processes: Vec<&str> = groups[0]
            .processes
            .iter()
            .map(|p| p.process.name.as_str())
            .collect();
        assert_eq!(strategic_processes, vec!["Planning", "Audit"]);

        let planning_ids: Vec<i64> = groups[0].processes[0]
            .indicators
            .iter()
            .map(|card| card.id)
            .collect();
        assert_eq!(planning_ids, vec![1, 4]);
    }

    #[test]
    fn missing_ancestry_goes_to_placeholder_group() {
        let items = vec![item(9, IndicatorCategory::Quality, None, None)];
        let groups = group_indicators(&items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].macroprocess.name, UNASSIGNED_MACROPROCESS);
        assert_eq!(groups[0].macroprocess.id, 0);
        assert_eq!(groups[0].processes[0].process.id, 0);
    }

    #[test]
    fn same_named_macroprocesses_merge() {
        let items = vec![
            item(
                1,
                IndicatorCategory::Quality,
                Some(process(1, "A", 1)),
                Some(macroprocess(1, "Ops")),
            ),
            item(
                2,
                IndicatorCategory::Quality,
                Some(process(2, "B", 2)),
                Some(macroprocess(2, "Ops")),
            ),
        ];
        let groups = group_indicators(&items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].macroprocess.id, 1);
        assert_eq!(groups[0].processes.len(), 2);
    }

    #[test]
    fn tally_counts_categories_and_macroprocesses() {
        let items = vec![
            item(
                1,
                IndicatorCategory::Quality,
                Some(process(1, "A", 1)),
                Some(macroprocess(1, "Ops")),
            ),
            item(
                2,
                IndicatorCategory::Efficacy,
                Some(process(2, "B", 2)),
                Some(macroprocess(2, "Finance")),
            ),
            item(3, IndicatorCategory::Quality, None, None),
        ];
        let tally = tally_indicators(&items);
        assert_eq!(tally.total, 3);
        assert_eq!(tally.by_category.len(), 2);
        assert_eq!(tally.by_category[0].category, IndicatorCategory::Efficacy);
        assert_eq!(tally.by_category[1].count, 2);
        let names: Vec<&str> = tally
            .by_macroprocess
            .iter()
            .map(|entry| entry.macroprocess.as_str())
            .collect();
        assert_eq!(names, vec!["Finance", "Ops"]);
    }
}
