use engine_core::progress::RunStatus;
use engine_runtime::execution::executor::RunSummary;
use model::records::stats::StatsSnapshot;

pub fn print_summary(summary: &RunSummary) {
    let outcome = if summary.interrupted {
        "interrupted"
    } else {
        "completed"
    };

    println!("Run {} {outcome}", summary.run_id);
    println!("-----------------------------");
    println!("{:<20} {}", "Head slot", summary.head_slot);
    println!("{:<20} {}", "Resumed from", summary.resumed_from);
    match summary.ingest.last_committed {
        Some(slot) => println!("{:<20} {}", "Last committed", slot),
        None => println!("{:<20} n/a", "Last committed"),
    }
    println!("{:<20} {}", "Batches", summary.ingest.batches_committed);
    println!("{:<20} {}", "Blocks persisted", summary.metrics.records_persisted);
    println!("{:<20} {}", "Missed slots", summary.metrics.records_skipped);
    println!("{:<20} {}", "Failures", summary.metrics.failure_count);
    println!("{:<20} {}", "Retries", summary.metrics.retry_count);
    println!(
        "{:<20} {}",
        "Recovered slots",
        summary.retried.succeeded + summary.retried.skipped
    );
    if let Some(recheck) = &summary.recheck {
        println!("{:<20} {}", "Validators refreshed", recheck.refreshed);
    }
    println!("{:<20} {:.1}s", "Elapsed", summary.elapsed.as_secs_f64());
}

pub fn print_status(status: &RunStatus) {
    println!("Status: {}", status.stage);
    println!("-----------------------------");
    println!(
        "{:<16} {}",
        "Run",
        status.run_id.as_deref().unwrap_or("n/a")
    );
    match &status.checkpoint {
        Some(cp) => {
            println!("{:<16} {}", "Last processed", cp.last_processed);
            println!("{:<16} {}", "Updated", cp.updated_at.to_rfc3339());
        }
        None => println!("{:<16} n/a", "Last processed"),
    }
    println!("{:<16} {}", "Blocks", status.blocks);
    println!("{:<16} {}", "Validators", status.validators);
    println!("{:<16} {}", "Failed slots", status.failed_slots);

    if !status.recent.is_empty() {
        println!();
        println!("Recent journal entries:");
        for entry in &status.recent {
            println!("  {}  {:<16} {}", entry.at().to_rfc3339(), entry.kind(), entry.run_id());
        }
    }
}

pub fn print_stats(snapshot: Option<&StatsSnapshot>) {
    let Some(s) = snapshot else {
        println!("No stats computed yet");
        return;
    };

    println!("Stats as of slot {}", s.head_slot);
    println!("-----------------------------");
    let term = if s.filter_term.is_empty() {
        "(all blocks)"
    } else {
        s.filter_term.as_str()
    };
    println!("{:<20} {}", "Graffiti filter", term);
    println!("{:<20} {}", "Matched blocks", s.matched_blocks);
    println!("{:<20} {}", "Distinct proposers", s.distinct_proposers);
    println!("{:<20} {}", "Unique operators", s.unique_operators);
    println!("{:<20} {}", "Active validators", s.active_validators);
    println!("{:<20} {}", "Computed at", s.created_at.to_rfc3339());
}
