use std::cmp::Ordering;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{PinSet, Process, SortConfig, SortDirection, SortField};

/// Orders processes with pinned commands first, then by `sort`.
///
/// The sort is stable, so rows that tie on pin status and key keep their
/// input order. Pin membership is resolved once per distinct command; the
/// memo lives for this call only. Text columns are collated once per row.
pub fn sort_processes<'a>(processes: Vec<&'a Process>, sort: &SortConfig, pins: &PinSet) -> Vec<(bool, &'a Process)> {
    let mut memo: HashMap<&'a str, bool> = HashMap::new();
    let mut decorated: Vec<(bool, Option<CollationKey>, &'a Process)> = processes
        .into_iter()
        .map(|p| {
            let pinned = *memo
                .entry(p.command.as_str())
                .or_insert_with(|| pins.contains(&p.command));
            let key = text_field(p, sort.field).map(CollationKey::new);
            (pinned, key, p)
        })
        .collect();

    decorated.sort_by(|(a_pinned, a_key, a), (b_pinned, b_key, b)| {
        b_pinned.cmp(a_pinned).then_with(|| {
            let ord = match (a_key, b_key) {
                (Some(a_key), Some(b_key)) => a_key.cmp(b_key),
                _ => compare_field(a, b, sort.field),
            };
            match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        })
    });

    decorated.into_iter().map(|(pinned, _, p)| (pinned, p)).collect()
}

fn text_field(p: &Process, field: SortField) -> Option<&str> {
    match field {
        SortField::Name => Some(&p.name),
        SortField::Command => Some(&p.command),
        SortField::User => Some(&p.user),
        SortField::Status => Some(p.status.code()),
        SortField::Root => Some(&p.root),
        _ => None,
    }
}

fn compare_field(a: &Process, b: &Process, field: SortField) -> Ordering {
    match field {
        SortField::Pid => a.pid.cmp(&b.pid),
        SortField::Ppid => a.ppid.cmp(&b.ppid),
        SortField::SessionId => a.session_id.cmp(&b.session_id),
        SortField::CpuUsage => a.cpu_usage.total_cmp(&b.cpu_usage),
        SortField::MemoryUsage => a.memory_usage.cmp(&b.memory_usage),
        SortField::VirtualMemory => a.virtual_memory.cmp(&b.virtual_memory),
        SortField::StartTime => a.start_time.cmp(&b.start_time),
        SortField::RunTime => a.run_time.cmp(&b.run_time),
        SortField::Threads => a.threads.cmp(&b.threads),
        SortField::Name
        | SortField::Command
        | SortField::User
        | SortField::Status
        | SortField::Root => text_field(a, field)
            .zip(text_field(b, field))
            .map_or(Ordering::Equal, |(a, b)| text_cmp(a, b)),
    }
}

/// Three-level sort key in the manner of the Unicode root collation.
///
/// Base letters decide first (`é` sorts with `e`), then accents (`e` before
/// `é`), then case (`a` before `A`). Raw text breaks any remaining tie.
/// Field order matters: the derived `Ord` compares them top to bottom.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct CollationKey {
    base: Vec<char>,
    accented: Vec<char>,
    upper: Vec<bool>,
    raw: String,
}

impl CollationKey {
    fn new(text: &str) -> Self {
        let decomposed: Vec<char> = text.nfd().collect();
        let folded = |c: &char| c.to_lowercase();

        Self {
            base: decomposed
                .iter()
                .filter(|c| !is_combining_mark(**c))
                .flat_map(folded)
                .collect(),
            accented: decomposed.iter().flat_map(folded).collect(),
            upper: decomposed
                .iter()
                .filter(|c| !is_combining_mark(**c))
                .map(|c| c.is_uppercase())
                .collect(),
            raw: text.to_string(),
        }
    }
}

fn text_cmp(a: &str, b: &str) -> Ordering {
    CollationKey::new(a).cmp(&CollationKey::new(b))
}
