use crate::infra::{
    demo_jobs, demo_profiles, demo_users, Marketplace, DEMO_CLIENT, DEMO_HISTORY,
};
use clap::Args;
use gigboard::config::RankingConfig;
use gigboard::error::AppError;
use gigboard::marketplace::applications::{
    Actor, ApplicationDraft, ApplicationStatus, ClientId, JobId, LifecycleError, ReviewPayload,
    TransitionTrigger, WorkerId,
};
use gigboard::marketplace::directory::{profiles_from_path, ProfileRecord, RankedCandidate};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of workers to show in the ranking. Defaults to the configured limit.
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Print every lifecycle step while seeding history.
    #[arg(long)]
    pub(crate) verbose_steps: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TopWorkersArgs {
    /// Number of workers to rank. Defaults to the configured limit.
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Optional profile export (CSV) replacing the built-in profiles.
    #[arg(long)]
    pub(crate) profiles_csv: Option<PathBuf>,
}

pub(crate) async fn run_demo(args: DemoArgs, ranking: RankingConfig) -> Result<(), AppError> {
    let limit = args.limit.unwrap_or(ranking.default_limit);
    let marketplace = Marketplace::assemble(ranking, demo_jobs(), demo_profiles(), demo_users());

    println!("Gig marketplace demo");
    println!("\nSeeding application history");
    seed_history(&marketplace, args.verbose_steps).await?;

    let client = Actor::Client(ClientId(DEMO_CLIENT.to_string()));
    let late = marketplace
        .lifecycle
        .apply_transition(
            &client,
            &marketplace
                .lifecycle
                .submit(
                    &Actor::Worker(WorkerId("worker-mei".to_string())),
                    ApplicationDraft {
                        job_id: JobId("job-copy".to_string()),
                        proposed_price: 280.0,
                        cover_letter: "Can start tomorrow.".to_string(),
                    },
                )
                .await?
                .id,
            TransitionTrigger::Start,
        )
        .await;
    match late {
        Err(err @ LifecycleError::InvalidTransition { .. }) => {
            println!("  - rejected out-of-order step: {err}");
        }
        Err(err) => return Err(err.into()),
        Ok(application) => {
            println!("  - unexpected transition to {}", application.status);
        }
    }

    let ranked = marketplace.directory.top_workers(limit).await?;
    println!("\nTop workers");
    render_ranking(&ranked);
    Ok(())
}

pub(crate) async fn run_top_workers(
    args: TopWorkersArgs,
    ranking: RankingConfig,
) -> Result<(), AppError> {
    let limit = args.limit.unwrap_or(ranking.default_limit);
    let profiles = load_profiles(args.profiles_csv)?;
    let marketplace = Marketplace::assemble(ranking, demo_jobs(), profiles, demo_users());
    seed_history(&marketplace, false).await?;

    let ranked = marketplace.directory.top_workers(limit).await?;
    render_ranking(&ranked);
    Ok(())
}

pub(crate) fn load_profiles(path: Option<PathBuf>) -> Result<Vec<ProfileRecord>, AppError> {
    match path {
        Some(path) => Ok(profiles_from_path(path)?),
        None => Ok(demo_profiles()),
    }
}

/// Drive every demo history entry through the lifecycle. Unrated entries stop
/// at `completed`.
pub(crate) async fn seed_history(
    marketplace: &Marketplace,
    verbose: bool,
) -> Result<(), AppError> {
    let client = Actor::Client(ClientId(DEMO_CLIENT.to_string()));

    for (job, worker, rating) in DEMO_HISTORY {
        let worker_actor = Actor::Worker(WorkerId(worker.to_string()));
        let application = marketplace
            .lifecycle
            .submit(
                &worker_actor,
                ApplicationDraft {
                    job_id: JobId(job.to_string()),
                    proposed_price: 250.0,
                    cover_letter: String::new(),
                },
            )
            .await?;

        let mut steps = vec![
            (client.clone(), TransitionTrigger::Accept),
            (worker_actor.clone(), TransitionTrigger::Start),
            (worker_actor.clone(), TransitionTrigger::Complete),
        ];
        if let Some(rating) = rating {
            steps.push((client.clone(), TransitionTrigger::ReleasePayment));
            steps.push((worker_actor.clone(), TransitionTrigger::ConfirmPayment));
            steps.push((
                client.clone(),
                TransitionTrigger::Review(ReviewPayload {
                    rating,
                    comment: None,
                }),
            ));
        }

        let mut status = ApplicationStatus::Pending;
        for (actor, trigger) in steps {
            let label = trigger.kind();
            let updated = marketplace
                .lifecycle
                .apply_transition(&actor, &application.id, trigger)
                .await?;
            if verbose {
                println!(
                    "  - {} {}: {} -> {}",
                    application.id, label, status, updated.status
                );
            }
            status = updated.status;
        }

        println!("  - {worker} on {job}: {status}");
    }

    Ok(())
}

fn render_ranking(ranked: &[RankedCandidate]) {
    if ranked.is_empty() {
        println!("  (no eligible workers)");
        return;
    }

    for entry in ranked {
        let reputation = entry.candidate.reputation();
        let origin = if entry.candidate.has_profile() {
            "profile"
        } else {
            "directory"
        };
        println!(
            "  {:>2}. {:<20} rating {:.1} ({} ratings, {} jobs) [{}]",
            entry.rank,
            entry.candidate.display_name(),
            reputation.display_rating(),
            reputation.total_ratings,
            reputation.completed_jobs,
            origin
        );
    }
}
