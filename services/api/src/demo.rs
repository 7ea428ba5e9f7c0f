use crate::infra::{
    load_records, InMemoryPipelineRepository, LoggingAlertPublisher, LoggingNavigation,
};
use clap::Args;
use placement_board::error::AppError;
use placement_board::workflows::pipeline::{
    BoardError, BoardServiceError, BoardView, CardId, DropTarget, MoveOutcome,
    PipelineBoardService, Placement, StageId, SubStageId, ViewConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

type DemoService = PipelineBoardService<InMemoryPipelineRepository, LoggingAlertPublisher>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON file of application records. Defaults to the bundled sample board.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Comma-separated stages to render expanded in the final board (e.g. interview,offer)
    #[arg(long)]
    pub(crate) expanded: Option<String>,
    /// Render only this stage in the final board, as on a narrow screen
    #[arg(long)]
    pub(crate) focus: Option<String>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seed,
        expanded,
        focus,
    } = args;

    println!("Application pipeline board demo");
    let repository = Arc::new(InMemoryPipelineRepository::with_records(load_records(
        seed.as_deref(),
    )?));
    let alerts = Arc::new(LoggingAlertPublisher::default());
    let service = PipelineBoardService::new(repository.clone(), alerts.clone())
        .with_navigation(Arc::new(LoggingNavigation));

    let summary = service.refresh().await?;
    println!(
        "- Loaded {} cards ({} coerced to Applied, {} sub-stages cleared, {} duplicates dropped)",
        summary.loaded,
        summary.coerced_stage.len(),
        summary.cleared_sub_stage.len(),
        summary.duplicates.len()
    );
    render_board(&service.render(&ViewConfig::new()));

    let ids = demo_cards(&service);
    let Some(mover) = ids.first().cloned() else {
        println!("\nBoard is empty; nothing to move.");
        return Ok(());
    };

    println!("\nDrag");
    let current = current_stage(&service, &mover)?;
    let column = if current == StageId::Interview {
        StageId::Offer
    } else {
        StageId::Interview
    };
    match service.drag(&mover, DropTarget::column(column)).await? {
        Some(outcome) => println!("- {}", describe_outcome(&outcome)),
        None => println!("- {mover} dropped inside its own column; no move issued"),
    }

    println!("\nMenu");
    let menu = service.menu(&mover)?;
    println!(
        "- {} destinations offered for {} (currently {})",
        menu.entries.len(),
        mover,
        menu.current.label()
    );
    let extended = Placement::new(StageId::Offer, Some(SubStageId::OfferExtended));
    match service.select_from_menu(&mover, extended).await? {
        Some(outcome) => println!("- {}", describe_outcome(&outcome)),
        None => println!("- {} is already at {}", mover, extended.label()),
    }

    if let Some(unlucky) = ids.get(1) {
        println!("\nBackend outage");
        repository.set_outage(true);
        let outcome = service.move_card(unlucky, StageId::Accepted, None).await?;
        repository.set_outage(false);
        println!("- {}", describe_outcome(&outcome));
        for notice in alerts.events() {
            println!("  Alert shown: {}", notice.message);
        }
    }

    if let Some(recommended) = ids.get(2) {
        println!("\nAdmin recommendation");
        let placement = Placement::new(StageId::Interview, Some(SubStageId::FinalInterviewStage));
        repository
            .recommend(recommended, placement)
            .map_err(BoardServiceError::from)?;
        let summary = service.refresh().await?;
        println!(
            "- Recommended {} for {}; refresh loaded {} cards",
            recommended,
            placement.label(),
            summary.loaded
        );
    }

    println!("\nActivation");
    let request = service.activate(&mover)?;
    match request.job {
        Some(job) => println!("- {} opens job {}", request.card_id, job.0),
        None => println!("- {} has no linked job", request.card_id),
    }

    println!("\nStage history for {mover}");
    let history = service.history(&mover).await?;
    if history.is_empty() {
        println!("  (no recorded moves)");
    }
    for entry in history {
        let placement = Placement::new(entry.stage, entry.sub_stage);
        println!(
            "  - {} -> {}",
            entry.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            placement.label()
        );
    }

    println!("\nFinal board");
    let config = ViewConfig::from_query(expanded.as_deref(), focus.as_deref());
    render_board(&service.render(&config));

    Ok(())
}

/// Up to three distinct cards, preferring ones that have not reached Offer yet.
fn demo_cards(service: &DemoService) -> Vec<CardId> {
    service.with_store(|store| {
        let mut cards: Vec<_> = store.cards().collect();
        cards.sort_by_key(|card| card.stage() >= StageId::Offer);
        cards.into_iter().take(3).map(|card| card.id.clone()).collect()
    })
}

fn current_stage(service: &DemoService, card_id: &CardId) -> Result<StageId, AppError> {
    service
        .card(card_id)
        .map(|card| card.stage())
        .ok_or_else(|| AppError::from(BoardError::UnknownCard(card_id.clone())))
}

fn describe_outcome(outcome: &MoveOutcome) -> String {
    match outcome {
        MoveOutcome::Confirmed(card) => format!(
            "{} \"{}\" confirmed at {}",
            card.id,
            card.title,
            card.placement.label()
        ),
        MoveOutcome::RolledBack { card, notice } => format!(
            "{} rolled back to {} ({})",
            card.id,
            card.placement.label(),
            notice.attempted
        ),
        MoveOutcome::Ignored(card_id) => format!("{card_id} already has a move in flight"),
        MoveOutcome::Stale(card_id) => format!("{card_id} left the board before the move resolved"),
    }
}

fn render_board(view: &BoardView) {
    for column in &view.columns {
        let marker = match (column.expandable, column.expanded) {
            (true, true) => "[-]",
            (true, false) => "[+]",
            (false, _) => "   ",
        };
        println!("{} {} ({})", marker, column.label, column.count);

        for lane in &column.lanes {
            if column.expanded {
                println!("      {} ({})", lane.label, lane.count);
            }
            for card in &lane.cards {
                let sub_stage = match (column.expanded, card.sub_stage_label) {
                    (false, Some(label)) => format!(" [{label}]"),
                    _ => String::new(),
                };
                let pending = if card.pending { " (saving...)" } else { "" };
                println!(
                    "        - {} {} at {}{}{}",
                    card.id, card.title, card.company, sub_stage, pending
                );
            }
        }
    }
    println!("  {} cards total", view.total_cards);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> DemoService {
        let repository = Arc::new(InMemoryPipelineRepository::with_records(
            load_records(None).expect("bundled seed parses"),
        ));
        let service =
            PipelineBoardService::new(repository, Arc::new(LoggingAlertPublisher::default()));
        service.load(load_records(None).expect("bundled seed parses"));
        service
    }

    #[test]
    fn demo_prefers_cards_before_the_offer_stage() {
        let service = service();
        let ids = demo_cards(&service);

        assert_eq!(ids.len(), 3);
        for id in &ids {
            let stage = current_stage(&service, id).expect("card on board");
            assert!(stage < StageId::Offer, "{id} is already at {stage}");
        }
    }

    #[tokio::test]
    async fn demo_runs_against_the_bundled_seed() {
        run_demo(DemoArgs {
            expanded: Some("interview,offer".to_string()),
            ..DemoArgs::default()
        })
        .await
        .expect("demo completes");
    }
}
