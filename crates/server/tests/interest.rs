//! Interest manager integration tests.
//!
//! Each test drives a `World` directly and inspects what the players'
//! sessions received. Mailbox capacities are large enough that a join can be
//! queued in full before the test drains it.

use std::collections::HashSet;
use std::sync::Arc;

use voxstream_engine::view::{ViewError, ViewVolume};
use voxstream_engine::world::position::ChunkPos;
use voxstream_server::config::{BotConfig, ServerConfig};
use voxstream_server::dashboard::Metrics;
use voxstream_server::generator::{FlatGenerator, VoidGenerator};
use voxstream_server::interest::{ChunkChange, JoinError, PlayerId, World};
use voxstream_server::mailbox::{self, Outbound};
use voxstream_server::player::{Identity, Position};
use voxstream_server::session::{self, Session};
use voxstream_server::universe::{Dimension, Universe};

const SPAWN: Position = Position::new(0.5, 7.0, 0.5);

fn void_world(max_render_distance: i32) -> World {
    World::new(
        Dimension::Overworld,
        SPAWN,
        Box::new(VoidGenerator),
        max_render_distance,
        Arc::new(Metrics::new()),
    )
}

async fn join(world: &World, entity_id: i32, render_distance: i32) -> (PlayerId, Session) {
    let (tx, rx) = mailbox::bounded(mailbox::DEFAULT_CAPACITY);
    let name = format!("p{}", entity_id);
    let id = world
        .join(entity_id, Identity::offline(&name), render_distance, tx)
        .await
        .unwrap();
    (id, Session::new(rx))
}

/// Every column of the view a player centered on `chunk` should hold.
fn view_columns(chunk: ChunkPos, render_distance: i32) -> HashSet<ChunkPos> {
    ViewVolume::from_center(chunk.x, 0, chunk.z, render_distance, 15, render_distance)
        .unwrap()
        .columns()
        .into_iter()
        .map(|c| ChunkPos::new(c.x, c.z))
        .collect()
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_loads_whole_view() {
    let world = void_world(32);
    let (_, mut session) = join(&world, 1, 2).await;
    session.pump();

    assert_eq!(session.tally().chunk_loads, 25);
    assert_eq!(session.loaded_columns(), view_columns(ChunkPos::new(0, 0), 2));
    assert_eq!(world.column_count().await, 25);
    world.verify().await.unwrap();
}

#[tokio::test]
async fn join_load_order_is_z_then_x_descending() {
    let world = void_world(32);
    let (_, mut session) = join(&world, 1, 1).await;
    let mut order = Vec::new();
    while let Some(Outbound::ChunkLoad(load)) = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        session.recv_one(),
    )
    .await
    .ok()
    .flatten()
    {
        assert!(load.full);
        order.push((load.x, load.z));
        if order.len() == 9 {
            break;
        }
    }
    assert_eq!(
        order,
        vec![
            (1, 1), (0, 1), (-1, 1),
            (1, 0), (0, 0), (-1, 0),
            (1, -1), (0, -1), (-1, -1),
        ]
    );
}

#[tokio::test]
async fn joins_exchange_exactly_one_spawn_each() {
    let world = void_world(32);
    let (a, mut sa) = join(&world, 1, 2).await;
    let (b, mut sb) = join(&world, 2, 2).await;
    sa.pump();
    sb.pump();

    assert_eq!(sa.tally().spawns, 1);
    assert_eq!(sb.tally().spawns, 1);
    assert_eq!(sa.visible_entities(), HashSet::from([2]));
    assert_eq!(sb.visible_entities(), HashSet::from([1]));
    assert_eq!(world.visible_to(a).await, vec![b]);
    assert_eq!(world.visible_to(b).await, vec![a]);

    let (_, mut sc) = join(&world, 3, 2).await;
    sa.pump();
    sb.pump();
    sc.pump();
    assert_eq!(sa.tally().spawns, 2);
    assert_eq!(sb.tally().spawns, 2);
    assert_eq!(sc.visible_entities(), HashSet::from([1, 2]));
    assert_eq!(world.players_in(ChunkPos::new(0, 0)).await.len(), 3);
    world.verify().await.unwrap();
}

#[tokio::test]
async fn invalid_render_distance_is_rejected_without_side_effects() {
    let world = void_world(32);
    let (tx, rx) = mailbox::bounded(16);
    let result = world.join(1, Identity::offline("bad"), -1, tx).await;

    assert_eq!(result, Err(JoinError::InvalidView(ViewError::InvalidRadius)));
    assert_eq!(world.player_count().await, 0);
    assert_eq!(world.column_count().await, 0);
    let mut session = Session::new(rx);
    assert_eq!(session.pump(), 0);
}

#[tokio::test]
async fn full_join_at_default_cap_fits_default_mailbox() {
    let world = void_world(mailbox::DEFAULT_MAX_RENDER_DISTANCE);
    let (tx, rx) = mailbox::bounded(mailbox::DEFAULT_CAPACITY);
    // Nothing drains until the join has returned.
    let joined = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        world.join(1, Identity::offline("far"), 64, tx),
    )
    .await
    .expect("join stalled on a full mailbox");
    joined.unwrap();

    let mut session = Session::new(rx);
    session.pump();
    assert_eq!(session.tally().chunk_loads, 4225);
}

#[tokio::test]
async fn render_distance_is_capped() {
    let world = void_world(3);
    let (a, mut session) = join(&world, 1, 10).await;
    session.pump();
    assert_eq!(world.snapshot_player(a).await.unwrap().render_distance, 3);
    assert_eq!(session.tally().chunk_loads, 49);
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

#[tokio::test]
async fn moving_east_loads_and_unloads_one_strip() {
    let world = void_world(32);
    let (a, mut session) = join(&world, 1, 4).await;
    session.pump();
    let after_join = session.tally();

    assert!(world.update_position(a, 16.5, 7.0, 0.5, true).await);
    let change = world.update_chunk(a).await;
    assert_eq!(
        change,
        ChunkChange {
            loaded: 9,
            unloaded: 9,
            linked: 0,
            unlinked: 0
        }
    );

    let mut loads = Vec::new();
    let mut unloads = Vec::new();
    loop {
        match tokio::time::timeout(std::time::Duration::from_millis(50), session.recv_one()).await {
            Ok(Some(Outbound::ChunkLoad(e))) => loads.push((e.x, e.z)),
            Ok(Some(Outbound::ChunkUnload(e))) => unloads.push((e.x, e.z)),
            Ok(Some(other)) => panic!("unexpected {other:?}"),
            _ => break,
        }
    }
    let east: Vec<_> = (-4..=4).rev().map(|z| (5, z)).collect();
    let west: Vec<_> = (-4..=4).rev().map(|z| (-4, z)).collect();
    assert_eq!(loads, east);
    assert_eq!(unloads, west);
    assert_eq!(after_join.chunk_loads, 81);
    assert_eq!(world.column_count().await, 90);
}

#[tokio::test]
async fn move_within_chunk_changes_nothing() {
    let world = void_world(32);
    let (a, mut session) = join(&world, 1, 2).await;
    session.pump();

    assert!(!world.update_position(a, 15.9, 8.0, 15.9, false).await);
    assert_eq!(world.update_chunk(a).await, ChunkChange::default());
    session.pump();
    assert_eq!(session.tally().chunk_loads, 25);
    assert_eq!(session.tally().chunk_unloads, 0);
}

#[tokio::test]
async fn positions_past_the_world_border_stay_usable() {
    let world = void_world(32);
    let (a, mut sa) = join(&world, 1, 1).await;
    let (_b, mut sb) = join(&world, 2, 1).await;
    sa.pump();

    assert!(world.update_position(a, 1.0e12, 7.0, 0.5, true).await);
    let change = world.update_chunk(a).await;
    assert_eq!((change.loaded, change.unloaded, change.unlinked), (9, 9, 1));
    let snapshot = world.snapshot_player(a).await.unwrap();
    assert_eq!(snapshot.chunk, ChunkPos::new(1_875_000, 0));

    // Later updates for the same player still work.
    assert!(!world.update_position(a, 2.0e12, 7.0, 0.5, true).await);
    assert_eq!(world.update_chunk(a).await, ChunkChange::default());
    world.update_look(a, 10.0, 0.0).await;
    sa.pump();
    sb.pump();
    assert_eq!(
        sa.loaded_columns(),
        view_columns(ChunkPos::new(1_875_000, 0), 1)
    );
    assert!(sb.visible_entities().is_empty());
    world.verify().await.unwrap();
}

#[tokio::test]
async fn look_and_move_reach_watchers_only() {
    let world = void_world(32);
    let (a, mut sa) = join(&world, 1, 1).await;
    let (_b, mut sb) = join(&world, 2, 1).await;
    let (c, mut sc) = join(&world, 3, 1).await;

    // Jump c three chunks east: its new view shares nothing with the old one.
    assert!(world.update_position(c, 48.5, 7.0, 0.5, true).await);
    let change = world.update_chunk(c).await;
    assert_eq!((change.loaded, change.unloaded, change.unlinked), (9, 9, 2));
    sa.pump();
    sb.pump();
    sc.pump();
    assert_eq!(sa.visible_entities(), HashSet::from([2]));
    assert!(sc.visible_entities().is_empty());

    let before_b = sb.tally();
    let before_c = sc.tally();
    let before_a = sa.tally();
    world.update_look(a, 90.0, -10.0).await;
    world.update_position(a, 1.5, 7.0, 0.0, true).await;
    sa.pump();
    sb.pump();
    sc.pump();
    assert_eq!(sb.tally().looks, before_b.looks + 1);
    assert_eq!(sb.tally().moves, before_b.moves + 1);
    assert_eq!(sc.tally(), before_c);
    assert_eq!(sa.tally(), before_a);
}

#[tokio::test]
async fn relative_move_carries_delta() {
    let world = void_world(32);
    let (a, _sa) = join(&world, 1, 1).await;
    let (_b, mut sb) = join(&world, 2, 1).await;
    sb.pump();

    world.update_position(a, 1.5, 7.0, 0.0, false).await;
    let event = tokio::time::timeout(std::time::Duration::from_millis(50), sb.recv_one())
        .await
        .unwrap()
        .unwrap();
    let Outbound::RelativeMove(m) = event else {
        panic!("expected a relative move, got {event:?}");
    };
    assert_eq!(m.entity_id, 1);
    assert_eq!((m.dx, m.dy, m.dz), (1.0, 0.0, -0.5));
    assert_eq!(m.fixed_point(), (4096, 0, -2048));
    assert!(!m.on_ground);
}

#[tokio::test]
async fn walking_keeps_session_model_in_step_with_view() {
    let world = void_world(32);
    let (a, mut sa) = join(&world, 1, 3).await;
    let (_b, mut sb) = join(&world, 2, 3).await;

    let mut x = SPAWN.x;
    let mut z = SPAWN.z;
    for step in 0..120 {
        x += 1.7;
        if step % 3 == 0 {
            z -= 2.3;
        }
        if world.update_position(a, x, 7.0, z, true).await {
            world.update_chunk(a).await;
        }
        sa.pump();
        sb.pump();

        let chunk = Position::new(x, 7.0, z).chunk();
        assert_eq!(sa.loaded_columns(), view_columns(chunk, 3), "step {step}");
        let sees_b = world.visible_to(a).await.len() == 1;
        assert_eq!(sa.visible_entities().contains(&2), sees_b, "step {step}");
        assert_eq!(sb.visible_entities().contains(&1), sees_b, "step {step}");
    }
    world.verify().await.unwrap();
    // Far enough away by now that b dropped out of view.
    assert!(world.visible_to(a).await.is_empty());
}

// ---------------------------------------------------------------------------
// Close
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_leaves_no_dangling_ids() {
    let world = void_world(32);
    let (a, mut sa) = join(&world, 1, 2).await;
    let (b, mut sb) = join(&world, 2, 2).await;
    sa.pump();
    sb.pump();

    let mailboxes = world.close(a).await;
    sb.pump();
    assert_eq!(sb.tally().despawns, 1);
    assert!(sb.visible_entities().is_empty());
    assert!(!world.is_referenced(a).await);
    assert!(world.visible_to(b).await.is_empty());
    assert_eq!(world.player_count().await, 1);
    // Columns stay for the life of the world.
    assert_eq!(world.column_count().await, 25);
    world.verify().await.unwrap();

    // The returned mailboxes are still wired to a's session.
    assert!(!mailboxes.is_closed());
    drop(mailboxes);
    sa.pump();
    assert!(sa.recv_one().await.is_none());
}

#[tokio::test]
async fn departed_session_does_not_stall_the_world() {
    let world = void_world(32);
    let (a, sa) = join(&world, 1, 1).await;
    drop(sa);

    let (_b, mut sb) = join(&world, 2, 1).await;
    sb.pump();
    assert_eq!(sb.visible_entities(), HashSet::from([1]));
    assert!(world.metrics().snapshot(0).dropped >= 1);

    world.close(a).await;
    sb.pump();
    assert!(sb.visible_entities().is_empty());
}

#[tokio::test]
#[should_panic(expected = "unknown player")]
async fn operations_on_a_closed_player_panic() {
    let world = void_world(32);
    let (a, _sa) = join(&world, 1, 1).await;
    world.close(a).await;
    world.update_look(a, 0.0, 0.0).await;
}

// ---------------------------------------------------------------------------
// Terrain and dimensions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generated_columns_are_streamed_with_their_sections() {
    let world = World::new(
        Dimension::Overworld,
        SPAWN,
        Box::new(FlatGenerator::classic()),
        32,
        Arc::new(Metrics::new()),
    );
    let (_a, mut sa) = join(&world, 1, 0).await;
    let event = sa.recv_one().await.unwrap();
    let Outbound::ChunkLoad(load) = event else {
        panic!("expected a chunk load, got {event:?}");
    };
    assert_eq!((load.x, load.z), (0, 0));
    assert_eq!(load.bitmask, 0b1);
    assert!(load.data.len() > 256);
}

fn small_config() -> ServerConfig {
    ServerConfig {
        render_distance: 2,
        max_render_distance: 2,
        mailbox_capacity: 25,
        bots: BotConfig {
            count: 3,
            steps: 40,
            step_interval_ms: 1,
            speed: 4.0,
        },
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn transfer_moves_player_between_worlds() {
    let universe = Universe::new(&ServerConfig::default(), Arc::new(Metrics::new())).unwrap();
    let overworld = universe.world(Dimension::Overworld);
    let nether = universe.world(Dimension::Nether);

    let entity_a = universe.allocate_entity_id();
    let entity_b = universe.allocate_entity_id();
    let (a, mut sa) = join(overworld, entity_a, 1).await;
    let (b, mut sb) = join(nether, entity_b, 1).await;
    sa.pump();
    sb.pump();
    assert!(sa.visible_entities().is_empty());

    let moved = universe
        .transfer(a, Dimension::Overworld, Dimension::Nether)
        .await
        .unwrap();
    sa.pump();
    sb.pump();

    assert_eq!(overworld.player_count().await, 0);
    assert_eq!(nether.player_count().await, 2);
    assert!(!overworld.is_referenced(a).await);
    assert_eq!(nether.snapshot_player(moved).await.unwrap().entity_id, entity_a);
    assert_eq!(nether.visible_to(b).await, vec![moved]);
    assert_eq!(sa.visible_entities(), HashSet::from([entity_b]));
    assert_eq!(sb.visible_entities(), HashSet::from([entity_a]));
    // Nine columns from each world, all over the same mailboxes.
    assert_eq!(sa.tally().chunk_loads, 18);
    assert_eq!(universe.player_count().await, 2);
}

#[test]
fn universe_rejects_mailboxes_too_small_for_a_join() {
    let config = ServerConfig {
        max_render_distance: 8,
        mailbox_capacity: 200,
        ..ServerConfig::default()
    };
    assert!(Universe::new(&config, Arc::new(Metrics::new())).is_err());
}

#[tokio::test]
async fn bots_walk_concurrently_through_small_mailboxes() {
    let config = Arc::new(small_config());
    let universe = Arc::new(Universe::new(&config, Arc::new(Metrics::new())).unwrap());

    let mut bots = tokio::task::JoinSet::new();
    for index in 0..config.bots.count {
        bots.spawn(session::run_bot(Arc::clone(&universe), Arc::clone(&config), index));
    }
    while let Some(joined) = bots.join_next().await {
        let tally = joined.unwrap().unwrap();
        // Close sends no unloads, so the final view is still counted as loaded.
        assert_eq!(tally.chunk_loads - tally.chunk_unloads, 25);
        assert!(tally.chunk_unloads > 0);
    }

    let world = universe.world(Dimension::Overworld);
    assert_eq!(world.player_count().await, 0);
    world.verify().await.unwrap();
    assert_eq!(universe.metrics().snapshot(0).players, 0);
}
