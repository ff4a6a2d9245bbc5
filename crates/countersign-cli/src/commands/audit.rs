//! Audit command implementation.

use countersign_journal::{verify_chain, AuditJournalReader, ReadMode};
use countersign_store::{ActionFilter, AndFilter, AuditFilter, AuditReader, FilteredReader, UserFilter};

use super::{parse_user, CommandResult, Paths};
use crate::output;

pub fn run(
    paths: &Paths,
    user: Option<String>,
    action: Option<String>,
    json: bool,
    check_chain: bool,
) -> CommandResult {
    let path = &paths.audit_journal;
    let mut reader = AuditJournalReader::open(path, ReadMode::Strict)
        .map_err(|e| format!("Failed to open audit journal {}: {}", path.display(), e))?;

    if check_chain {
        let report = verify_chain(&mut reader)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if report.is_intact() {
            println!("chain intact: {} records", report.records);
        }
        if let (Some(seq), Some(reason)) = (report.first_broken, &report.reason) {
            return Err(format!("Audit chain broken at record {}: {:?}", seq, reason).into());
        }
        return Ok(());
    }

    let mut filters: Vec<Box<dyn AuditFilter>> = Vec::new();
    if let Some(user) = user {
        filters.push(Box::new(UserFilter {
            user_id: parse_user(&user)?,
        }));
    }
    if let Some(action) = action {
        filters.push(Box::new(ActionFilter { action }));
    }
    let mut records = FilteredReader::new(reader, AndFilter { filters });

    if !json {
        output::print_audit_header();
    }
    while let Some(record) = records.read_next()? {
        if json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!("{}", output::format_audit_row(&record));
        }
    }
    Ok(())
}
