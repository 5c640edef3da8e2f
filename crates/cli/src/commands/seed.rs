use crate::commands::session::Session;
use crate::commands::CommandResult;
use lendflow_db::{connect_with_config, migrations, DemoDataset, SeedResult};

pub fn run() -> CommandResult {
    let session = match Session::open("seed") {
        Ok(session) => session,
        Err(failure) => return failure,
    };

    let result = session.block_on(async {
        let pool = connect_with_config(&session.config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result = if verification.all_present {
            Ok(seeded)
        } else {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_message(&failed_checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "demo dataset loaded: {} approvers, {} credit rules, applications {}",
        seeded.approvers,
        seeded.credit_rules,
        seeded.applications.join(", ")
    )
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use lendflow_db::SeedResult;

    use super::{summary, verification_message};

    #[test]
    fn verification_message_targets_failed_checks() {
        assert_eq!(
            verification_message(&["cj-1", "rule-pl-senior"]),
            "seed verification failed for: cj-1, rule-pl-senior"
        );
    }

    #[test]
    fn verification_message_falls_back_to_generic_without_labels() {
        assert_eq!(verification_message(&[]), "some seed data failed to load");
    }

    #[test]
    fn summary_lists_seeded_applications() {
        let seeded = SeedResult {
            approvers: 9,
            credit_rules: 2,
            applications: vec!["LA-DEMO-001".to_string(), "LA-DEMO-002".to_string()],
        };

        assert_eq!(
            summary(&seeded),
            "demo dataset loaded: 9 approvers, 2 credit rules, applications LA-DEMO-001, LA-DEMO-002"
        );
    }
}
