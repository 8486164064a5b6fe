//! Multi-tab broadcast scenarios: two session views over one in-process hub.

use std::sync::Arc;

use uuid::Uuid;

use inkstream_canvas::{CanvasLayers, NukeEvent, Point, Stroke};
use inkstream_realtime::{
    BoardEvent, BroadcastHub, BroadcastTransport, ConnectionStatus, ReconnectSupervisor,
};

fn stroke(n: usize) -> Stroke {
    let points = (0..n).map(|i| Point::new(i as f32, i as f32)).collect();
    Stroke::new(points, "#00ff88", 3.0, Some("drawer1".into()))
}

async fn wait_connected(handle: &inkstream_realtime::SupervisorHandle) {
    let mut watch = handle.status_watch();
    while *watch.borrow() != ConnectionStatus::Connected {
        watch.changed().await.unwrap();
    }
}

#[tokio::test]
async fn test_stroke_broadcast_reaches_peer_tab() {
    let hub = BroadcastHub::new();
    let session = Uuid::new_v4();

    let tab_a = ReconnectSupervisor::new(Arc::new(BroadcastTransport::new(hub.clone())))
        .spawn(session);
    let mut tab_b =
        ReconnectSupervisor::new(Arc::new(BroadcastTransport::new(hub))).spawn(session);

    wait_connected(&tab_a).await;
    wait_connected(&tab_b).await;

    let mut layers_b = CanvasLayers::new();
    tab_a
        .send(BoardEvent::draw_batch(vec![stroke(5)]).unwrap())
        .await
        .unwrap();

    match tab_b.recv_event().await.unwrap() {
        BoardEvent::DrawBatch { strokes } => {
            for s in strokes {
                layers_b.merge_peer(s);
            }
        }
        other => unreachable!("expected draw batch, got {:?}", other),
    }
    // peer strokes composite straight into the persisted layer
    assert_eq!(layers_b.persisted_count(), 1);

    tab_a.shutdown().await;
    tab_b.shutdown().await;
}

#[tokio::test]
async fn test_nuke_clears_both_tabs_with_one_attribution_each() {
    let hub = BroadcastHub::new();
    let session = Uuid::new_v4();

    let mut tab_a = ReconnectSupervisor::new(Arc::new(BroadcastTransport::new(hub.clone())))
        .spawn(session);
    let mut tab_b =
        ReconnectSupervisor::new(Arc::new(BroadcastTransport::new(hub.clone()))).spawn(session);

    wait_connected(&tab_a).await;
    wait_connected(&tab_b).await;

    let mut layers_a = CanvasLayers::new();
    let mut layers_b = CanvasLayers::new();
    for _ in 0..4 {
        layers_a.merge_peer(stroke(3));
        layers_b.merge_peer(stroke(3));
    }

    // a third participant nukes the board
    let nuker = ReconnectSupervisor::new(Arc::new(BroadcastTransport::new(hub))).spawn(session);
    wait_connected(&nuker).await;
    let nuke = NukeEvent::new(Some("nuker".into()), "laser");
    // the nuker clears locally with the same logical timestamp
    nuker.send(BoardEvent::nuke(nuke.clone())).await.unwrap();

    let overlay_a = match tab_a.recv_event().await.unwrap() {
        BoardEvent::Nuke { event } => layers_a.apply_nuke(&event),
        other => unreachable!("expected nuke, got {:?}", other),
    };
    let overlay_b = match tab_b.recv_event().await.unwrap() {
        BoardEvent::Nuke { event } => layers_b.apply_nuke(&event),
        other => unreachable!("expected nuke, got {:?}", other),
    };

    // both canvases fully cleared, one animated attribution each
    assert_eq!(layers_a.composite().count(), 0);
    assert_eq!(layers_b.composite().count(), 0);
    assert!(overlay_a.is_some());
    assert!(overlay_b.is_some());

    // a duplicate delivery of the same nuke must not double-animate
    assert!(layers_a.apply_nuke(&nuke).is_none());

    tab_a.shutdown().await;
    tab_b.shutdown().await;
    nuker.shutdown().await;
}
