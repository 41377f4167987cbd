#![allow(dead_code)]

use std::path::Path;
use std::sync::Once;

use chrono::{Duration, TimeZone, Utc};
use schoolfix_lib::store::file;
use schoolfix_lib::{Category, Issue, Priority, Status};

pub mod cli;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        schoolfix::logging::init_test_logging();
    });
}

/// A valid stored issue; larger `seq` means created later.
pub fn sample_issue(
    seq: i64,
    title: &str,
    category: Category,
    priority: Priority,
    status: Status,
) -> Issue {
    let base = Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).single().expect("fixed instant");
    let created_at = base + Duration::minutes(seq);
    let updated_at = created_at + Duration::minutes(5);
    Issue {
        id: format!("ISS-{}-{:05}", created_at.timestamp_millis(), seq),
        title: title.to_string(),
        description: format!("{title} (reported in the fixture)"),
        category,
        priority,
        status,
        created_at,
        updated_at,
        resolved_at: status.is_resolved().then_some(updated_at),
        ..Default::default()
    }
}

/// Three issues, newest first, as the file store keeps them.
pub fn sample_collection() -> Vec<Issue> {
    vec![
        sample_issue(3, "Wifi down in library", Category::Network, Priority::High, Status::Pending),
        sample_issue(2, "Broken chair", Category::Equipment, Priority::Low, Status::Resolved),
        sample_issue(1, "Leaking tap", Category::Utilities, Priority::Medium, Status::InProgress),
    ]
}

pub fn write_collection(path: &Path, issues: &[Issue]) {
    file::save(path, issues).expect("write fixture collection");
}
