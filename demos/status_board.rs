//! SGM status board example.
//!
//! This example demonstrates:
//! - Loading configuration and installing the tracing subscriber
//! - Seeding the in-memory backend with a change control and a stock item
//! - Rendering action boards for each record
//! - Approving a change control and quarantining a stock item
//! - Observing workflow events
//! - Derived metrics for instruments
//!
//! Run with: `cargo run --example status_board`

use chrono::Utc;
use serde_json::json;
use sgm_workflow::{
    init_tracing, AllowAll, ChangeControl, ChangeControlStatus, MemoryResourceClient,
    OrificePlate, Result, SgmConfig, StockItem, StockItemStatus, TransitionController,
    WorkflowEvent, WorkflowState, QUARANTINE_FLAG,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = SgmConfig::load()?;
    init_tracing(&config.logging)?;

    println!("╔═══════════════════════════════════════════╗");
    println!("║  SGM Status Board Example                 ║");
    println!("╚═══════════════════════════════════════════╝\n");

    // Seed the backend
    let backend = MemoryResourceClient::new();
    backend
        .register_definition(&ChangeControlStatus::definition()?)
        .await?;
    backend
        .register_definition(&StockItemStatus::definition()?)
        .await?;
    backend
        .on_transition(
            "controle-mudancas",
            "aprovada-nivel-1",
            "data_aprovacao_nivel_1",
            json!(Utc::now().date_naive().to_string()),
        )
        .await;
    backend
        .insert(
            "controle-mudancas",
            json!({"id": 1, "numero_moc": "MOC-2024-001", "status_moc": "Em Analise"}),
        )
        .await;
    backend
        .insert(
            "estoque",
            json!({
                "id": 10,
                "numero_serie_equipamento": "FT-3051-0042",
                "status_estoque": "Disponivel",
                "proxima_inspecao": "2024-01-15"
            }),
        )
        .await;

    let controller = TransitionController::new(backend, AllowAll);

    // Subscribe to events (in background)
    let mut event_receiver = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_receiver.recv().await {
            match event {
                WorkflowEvent::TransitionApplied { item_id, from, to, .. } => {
                    println!("   [Event] #{item_id}: {from} -> {to}");
                }
                WorkflowEvent::ToggleApplied { item_id, flag, raised, .. } => {
                    println!("   [Event] #{item_id}: {flag} = {raised}");
                }
                WorkflowEvent::TransitionRejected { item_id, reason, .. } => {
                    println!("   [Event] #{item_id} rejected: {reason}");
                }
                _ => {}
            }
        }
    });

    // Change control
    println!("📋 Change control");
    println!("─────────────────────────────────────────");
    let moc = controller.refresh::<ChangeControl>().await?.remove(0);
    println!("{}", controller.board(&moc)?);

    let moc = controller
        .transition(&moc, ChangeControlStatus::ApprovedL1)
        .await?;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    println!("{}", controller.board(&moc)?);

    // A second first-level approval is refused locally
    if let Err(err) = controller
        .transition(&moc, ChangeControlStatus::ApprovedL1)
        .await
    {
        println!("   Refused: {err}\n");
    }

    // Stock item
    println!("📦 Stock item");
    println!("─────────────────────────────────────────");
    let item = controller.refresh::<StockItem>().await?.remove(0);
    println!("{}", controller.board(&item)?);

    let item = controller.toggle(&item, QUARANTINE_FLAG, true).await?;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    println!("{}", controller.board(&item)?);

    let inspection = item.inspection_status(Utc::now().date_naive(), &config.due.inspection);
    println!("   Inspection: {:?}\n", inspection.kind);

    // Derived metrics
    println!("📐 Orifice plate");
    println!("─────────────────────────────────────────");
    let plate: OrificePlate = serde_json::from_value(json!({
        "id": 3,
        "numero_serie_placa": "OP-101",
        "diametro_orificio_mm": "50.8",
        "diametro_tubulacao_mm": 101.6
    }))?;
    match plate.beta_ratio() {
        Some(beta) => println!("   β = {beta}"),
        None => println!("   β = n/a"),
    }

    Ok(())
}
