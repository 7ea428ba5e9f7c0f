use std::sync::Arc;

use super::common::*;
use crate::workflows::pipeline::domain::Placement;
use crate::workflows::pipeline::stage::{StageId, SubStageId, UnknownStage};
use crate::workflows::pipeline::store::{BoardError, BoardStore, MoveOutcome};
use crate::workflows::pipeline::surface::{
    render, CardMenu, DragSession, DropOutcome, DropTarget, MoveIntent, ViewConfig,
};

fn loaded_store() -> BoardStore {
    let mut store = BoardStore::new();
    store.load(sample_records());
    store
}

fn interview_at(sub_stage: SubStageId) -> Placement {
    Placement::new(StageId::Interview, Some(sub_stage))
}

#[test]
fn renders_one_flat_column_per_stage_in_display_order() {
    let store = loaded_store();
    let view = render(&store, &ViewConfig::new());

    let stages: Vec<_> = view.columns.iter().map(|column| column.stage).collect();
    assert_eq!(stages, StageId::ordered().to_vec());
    assert_eq!(view.total_cards, 7);

    let interview = &view.columns[2];
    assert!(interview.expandable);
    assert!(!interview.expanded);
    assert_eq!(interview.lanes.len(), 1);
    assert_eq!(interview.count, 3);
    assert_eq!(interview.lanes[0].target, DropTarget::column(StageId::Interview));

    let applied = &view.columns[1];
    assert!(!applied.expandable);
    assert_eq!(applied.lanes[0].cards[0].id, card_id("7"));
}

#[test]
fn expanded_columns_offer_a_lane_per_sub_stage_plus_the_bare_stage() {
    let store = loaded_store();
    let mut config = ViewConfig::new();
    assert!(config.toggle(StageId::Interview));

    let view = render(&store, &config);
    let interview = &view.columns[2];
    assert!(interview.expanded);

    let targets: Vec<_> = interview.lanes.iter().map(|lane| lane.target).collect();
    assert_eq!(
        targets,
        vec![
            DropTarget::lane(Placement::stage_only(StageId::Interview)),
            DropTarget::lane(interview_at(SubStageId::PhoneScreening)),
            DropTarget::lane(interview_at(SubStageId::InterviewStage)),
            DropTarget::lane(interview_at(SubStageId::FinalInterviewStage)),
        ]
    );
    let counts: Vec<_> = interview.lanes.iter().map(|lane| lane.count).collect();
    assert_eq!(counts, vec![1, 1, 0, 1]);
    assert_eq!(interview.count, 3);

    let offer = &view.columns[3];
    assert!(!offer.expanded, "toggles are independent per column");
}

#[test]
fn toggling_is_limited_to_columns_with_sub_stages() {
    let mut config = ViewConfig::new();
    assert!(!config.toggle(StageId::Rejected));
    assert!(!config.is_expanded(StageId::Rejected));

    assert!(config.toggle(StageId::Offer));
    assert!(!config.toggle(StageId::Offer));
    assert!(!config.is_expanded(StageId::Offer));
}

#[test]
fn focus_renders_a_single_column() {
    let store = loaded_store();
    let mut config = ViewConfig::new();
    config.focus(StageId::Offer);

    let view = render(&store, &config);
    assert_eq!(view.columns.len(), 1);
    assert_eq!(view.columns[0].stage, StageId::Offer);

    config.unfocus();
    assert_eq!(render(&store, &config).columns.len(), 7);
}

#[test]
fn view_config_from_query_skips_unknown_names() {
    let config =
        ViewConfig::from_query(Some("interview, bogus,rejected,offer"), Some("offer"));

    assert!(config.is_expanded(StageId::Interview));
    assert!(config.is_expanded(StageId::Offer));
    assert!(!config.is_expanded(StageId::Rejected));
    assert_eq!(config.focused(), Some(StageId::Offer));

    assert_eq!(ViewConfig::from_query(None, Some("nowhere")), ViewConfig::new());
}

#[test]
fn view_state_never_changes_the_board() {
    let store = loaded_store();
    let before = store.snapshot();
    let mut config = ViewConfig::new();
    config.toggle(StageId::Interview);
    config.focus(StageId::Interview);

    render(&store, &config);
    assert_eq!(store.snapshot(), before);
}

#[test]
fn pending_cards_render_as_non_interactive() {
    let mut store = loaded_store();
    store
        .begin_move(&card_id("7"), StageId::Offer, None, at(5, 10))
        .expect("card 7 exists");

    let view = render(&store, &ViewConfig::new());
    let offer_cards = &view.columns[3].lanes[0].cards;
    let moved = offer_cards
        .iter()
        .find(|card| card.id == card_id("7"))
        .expect("optimistic placement is rendered");
    assert!(moved.pending);
    assert!(!moved.interactive());

    let other = &view.columns[0].lanes[0].cards[0];
    assert!(other.interactive());
}

#[test]
fn drops_inside_the_origin_partition_issue_nothing() {
    let store = loaded_store();
    let card = store.card(&card_id("2")).expect("card 2 loaded");

    let into_own_lane = DragSession::pick_up(card).drop_on(DropTarget::lane(card.placement));
    assert_eq!(into_own_lane, DropOutcome::Reorder);

    let into_own_column =
        DragSession::pick_up(card).drop_on(DropTarget::column(StageId::Interview));
    assert_eq!(into_own_column, DropOutcome::Reorder);

    assert_eq!(DragSession::pick_up(card).release(), DropOutcome::Cancelled);
}

#[test]
fn drops_into_another_partition_issue_one_intent() {
    let store = loaded_store();
    let card = store.card(&card_id("2")).expect("card 2 loaded");

    let sibling_lane = interview_at(SubStageId::FinalInterviewStage);
    assert_eq!(
        DragSession::pick_up(card).drop_on(DropTarget::lane(sibling_lane)),
        DropOutcome::Move(MoveIntent::new(card_id("2"), sibling_lane))
    );

    assert_eq!(
        DragSession::pick_up(card).drop_on(DropTarget::column(StageId::Rejected)),
        DropOutcome::Move(MoveIntent::new(
            card_id("2"),
            Placement::stage_only(StageId::Rejected)
        ))
    );
}

#[test]
fn menu_lists_every_destination_except_the_current_one() {
    let store = loaded_store();
    let card = store.card(&card_id("4")).expect("card 4 loaded");
    let menu = CardMenu::for_card(card, false);

    assert_eq!(menu.entries.len(), Placement::all().len() - 1);
    assert!(menu
        .entries
        .iter()
        .all(|entry| entry.destination != card.placement));
    assert_eq!(menu.select(card.placement), None);

    let labels: Vec<_> = menu
        .entries
        .iter()
        .map(|entry| entry.label.as_str())
        .collect();
    assert!(labels.contains(&"Offer"));
    assert!(labels.contains(&"Offer / Offer Extended"));
    assert!(!labels.contains(&"Offer / Negotiation"));
}

#[test]
fn move_intent_parse_rejects_unknown_stages_and_clears_unknown_sub_stages() {
    assert_eq!(
        MoveIntent::parse(card_id("1"), "hired", None),
        Err(BoardError::UnknownStage(UnknownStage("hired".to_string())))
    );
    assert_eq!(
        MoveIntent::parse(card_id("1"), "interview", Some("onsite")),
        Ok(MoveIntent::new(
            card_id("1"),
            Placement::stage_only(StageId::Interview)
        ))
    );
}

#[tokio::test]
async fn drag_and_menu_produce_identical_moves() {
    let destination = Placement::new(StageId::Offer, Some(SubStageId::OfferExtended));

    let store = loaded_store();
    let card = store.card(&card_id("2")).expect("card 2 loaded");
    let dragged = match DragSession::pick_up(card).drop_on(DropTarget::lane(destination)) {
        DropOutcome::Move(intent) => intent,
        other => panic!("expected a move, got {other:?}"),
    };
    let selected = CardMenu::for_card(card, false)
        .select(destination)
        .expect("destination offered");
    assert_eq!(dragged, selected);

    let (drag_service, drag_repository, _) = build_service();
    let (menu_service, menu_repository, _) = build_service();

    let drag_outcome = drag_service
        .drag(&card_id("2"), DropTarget::lane(destination))
        .await
        .expect("card 2 exists")
        .expect("drag issues a move");
    let menu_outcome = menu_service
        .select_from_menu(&card_id("2"), destination)
        .await
        .expect("card 2 exists")
        .expect("destination offered");

    match (&drag_outcome, &menu_outcome) {
        (MoveOutcome::Confirmed(by_drag), MoveOutcome::Confirmed(by_menu)) => {
            assert_eq!(by_drag.placement, by_menu.placement);
        }
        other => panic!("expected two confirmations, got {other:?}"),
    }
    assert_eq!(drag_repository.calls(), menu_repository.calls());
    assert_eq!(drag_repository.calls().len(), 1);
    assert_eq!(
        drag_service.with_store(|store| store.snapshot()),
        menu_service.with_store(|store| store.snapshot())
    );
}

#[tokio::test]
async fn drag_within_the_same_partition_never_reaches_the_backend() {
    let (service, repository, _) = build_service();

    let outcome = service
        .drag(&card_id("3"), DropTarget::column(StageId::Interview))
        .await
        .expect("card 3 exists");

    assert_eq!(outcome, None);
    assert!(repository.calls().is_empty());
}

#[tokio::test]
async fn menu_reports_pending_cards() {
    let (service, repository, _) = build_gated_service();
    let moving = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.move_card(&card_id("1"), StageId::Applied, None).await }
    });
    repository.entered().await;

    let menu = service.menu(&card_id("1")).expect("card 1 exists");
    assert!(menu.pending);
    assert_eq!(menu.current, Placement::stage_only(StageId::Applied));

    let ignored = service
        .select_from_menu(&card_id("1"), Placement::stage_only(StageId::Offer))
        .await
        .expect("card 1 exists");
    assert_eq!(ignored, Some(MoveOutcome::Ignored(card_id("1"))));

    repository.release(1);
    moving.await.expect("task joins").expect("card 1 exists");
    assert_eq!(repository.calls().len(), 1);
}
