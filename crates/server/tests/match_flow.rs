use protocol::PlayerId;
use serde_json::{Value, json};
use server::room::ClockEvent;
use server::{Config, GameState, Outbound, SessionId};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};

const SEC: Duration = Duration::from_secs(1);

fn config() -> Config {
    let mut config = Config::default();
    config.food.max_amount = 2000;
    config.rooms.max_players = 4;
    config
}

fn open(game: &mut GameState) -> (SessionId, UnboundedReceiver<Outbound>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = game.open_session("127.0.0.1:7000".parse().unwrap(), tx);
    (session, rx)
}

fn send(game: &mut GameState, session: SessionId, message: Value) {
    game.handle_message(session, &message.to_string()).unwrap();
}

/// Every queued frame, decoded. `Close` shows up as `{"close": true}`.
fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(out) = rx.try_recv() {
        frames.push(match out {
            Outbound::Text(text) => serde_json::from_str(&text).unwrap(),
            Outbound::Close => json!({ "close": true }),
        });
    }
    frames
}

fn join(game: &mut GameState, session: SessionId, rx: &mut UnboundedReceiver<Outbound>, name: &str) -> PlayerId {
    send(game, session, json!({ "type": "connect", "username": name }));
    let frames = drain(rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "roomFound");
    frames[0]["playerID"].as_str().unwrap().parse().unwrap()
}

fn move_to(game: &mut GameState, session: SessionId, id: PlayerId, x: f32, y: f32) {
    send(
        game,
        session,
        json!({ "type": "positionChanged", "id": id, "roomId": 1, "newPos": { "x": x, "y": y } }),
    );
}

fn chunk_ids(frame: &Value) -> Vec<u64> {
    frame["chunks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_u64().unwrap())
        .collect()
}

#[test]
fn room_found_covers_spawn_neighbourhood() {
    let mut game = GameState::new(&config());
    let (s, mut rx) = open(&mut game);
    send(&mut game, s, json!({ "type": "connect", "username": "alice" }));

    let frames = drain(&mut rx);
    let found = &frames[0];
    assert_eq!(found["type"], "roomFound");
    assert_eq!(found["roomId"], 1);
    assert_eq!(found["matchDuration"], 30_000);
    assert_eq!(found["username"], "alice");
    assert_eq!(found["size"], 60.0);

    let id: PlayerId = found["playerID"].as_str().unwrap().parse().unwrap();
    let player = game.players.get(&id).unwrap();
    let room = game.room(1).unwrap();
    let expected: Vec<u64> = room.grid.neighbourhood(player.chunk_id).map(|c| c as u64).collect();
    assert_eq!(chunk_ids(found), expected);

    for chunk in found["chunks"].as_array().unwrap() {
        let cid = chunk["id"].as_u64().unwrap() as usize;
        assert_eq!(chunk["food"].as_array().unwrap().len(), room.index.food(cid).len());
        assert!(chunk["players"].as_array().unwrap().is_empty());
    }
}

#[test]
fn player_at_origin_sees_origin_neighbourhood() {
    let mut game = GameState::new(&config());
    let (s, mut rx) = open(&mut game);
    let id = join(&mut game, s, &mut rx, "origin");
    move_to(&mut game, s, id, 0.0, 0.0);

    let origin = 7 * 16 + 7;
    assert_eq!(game.players.get(&id).unwrap().chunk_id, origin);

    let effects = game.tick();
    game.deliver(effects);
    let frames = drain(&mut rx);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "tick");

    let ids = chunk_ids(&frames[0]);
    assert_eq!(ids.len(), 9);
    assert_eq!(ids[0], origin as u64);
    for neighbour in [6 * 16 + 6, 6 * 16 + 7, 6 * 16 + 8, 7 * 16 + 6, 7 * 16 + 8, 8 * 16 + 6, 8 * 16 + 7, 8 * 16 + 8] {
        assert!(ids.contains(&neighbour));
    }
    let food: usize = frames[0]["chunks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["food"].as_array().unwrap().len())
        .sum();
    assert!(food > 0);
}

#[test]
fn move_between_columns_migrates_once() {
    let mut game = GameState::new(&config());
    let (s, mut rx) = open(&mut game);
    let id = join(&mut game, s, &mut rx, "walker");

    // chunk (0,0) is id 0, chunk (1,0) is id 16
    move_to(&mut game, s, id, -9500.0, -9500.0);
    assert_eq!(game.room(1).unwrap().index.players(0), &[id]);

    move_to(&mut game, s, id, -8500.0, -9500.0);
    let room = game.room(1).unwrap();
    assert!(room.index.players(0).is_empty());
    assert_eq!(room.index.players(16), &[id]);
    assert_eq!(room.player_count(), 1);
    assert_eq!(game.players.get(&id).unwrap().chunk_id, 16);
}

#[test]
fn neighbours_see_each_other_but_not_themselves() {
    let mut game = GameState::new(&config());
    let (s1, mut rx1) = open(&mut game);
    let (s2, mut rx2) = open(&mut game);
    let a = join(&mut game, s1, &mut rx1, "a");
    let b = join(&mut game, s2, &mut rx2, "b");
    move_to(&mut game, s1, a, 100.0, 100.0);
    move_to(&mut game, s2, b, 900.0, 100.0);

    let effects = game.tick();
    game.deliver(effects);
    let seen = |frames: Vec<Value>| -> Vec<String> {
        frames[0]["chunks"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|c| c["players"].as_array().unwrap().clone())
            .map(|p| p["username"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(seen(drain(&mut rx1)), vec!["b"]);
    assert_eq!(seen(drain(&mut rx2)), vec!["a"]);
}

#[test]
fn size_changed_consumes_reported_food() {
    let mut game = GameState::new(&config());
    let (s, mut rx) = open(&mut game);
    let id = join(&mut game, s, &mut rx, "eater");

    let target = {
        let room = game.room(1).unwrap();
        room.grid
            .chunks()
            .iter()
            .find_map(|c| room.index.food(c.id).first().map(|f| f.position))
            .unwrap()
    };
    move_to(&mut game, s, id, target.x, target.y);
    send(
        &mut game,
        s,
        json!({ "type": "sizeChanged", "id": id, "roomId": 1, "newSize": 64.0, "food": { "x": target.x, "y": target.y } }),
    );

    let room = game.room(1).unwrap();
    assert_eq!(room.food.count(), 1999);
    assert_eq!(room.index.food_len(), 1999);
    assert_eq!(game.players.get(&id).unwrap().size, 64.0);

    // same coordinates again: already gone
    send(
        &mut game,
        s,
        json!({ "type": "sizeChanged", "id": id, "roomId": 1, "newSize": 65.0, "food": { "x": target.x, "y": target.y } }),
    );
    assert_eq!(game.room(1).unwrap().food.count(), 1999);
}

#[test]
fn player_eaten_twice_removes_once() {
    let mut game = GameState::new(&config());
    let (s1, mut rx1) = open(&mut game);
    let (s2, mut rx2) = open(&mut game);
    let hunter = join(&mut game, s1, &mut rx1, "hunter");
    let prey = join(&mut game, s2, &mut rx2, "prey");
    assert_eq!(game.room(1).unwrap().player_count(), 2);

    let eaten = json!({ "type": "playerEaten", "roomId": 1, "eater": hunter, "eaten": prey });
    send(&mut game, s1, eaten.clone());
    send(&mut game, s1, eaten);

    assert!(!game.players.contains(&prey));
    assert_eq!(game.room(1).unwrap().player_count(), 1);
    assert_eq!(game.room(1).unwrap().index.all_players().collect::<Vec<_>>(), vec![&hunter]);

    let frames = drain(&mut rx2);
    assert_eq!(frames, vec![json!({ "type": "eaten", "eater": "hunter" }), json!({ "close": true })]);
    assert!(drain(&mut rx1).is_empty());
    assert_eq!(game.sessions.len(), 1);
}

#[test]
fn full_rooms_reject_connect() {
    let mut config = config();
    config.rooms.max_players = 1;
    let mut game = GameState::new(&config);
    let (s1, mut rx1) = open(&mut game);
    let (s2, mut rx2) = open(&mut game);
    join(&mut game, s1, &mut rx1, "first");

    send(&mut game, s2, json!({ "type": "connect", "username": "second" }));
    let frames = drain(&mut rx2);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "rejected");
    assert_eq!(game.players.len(), 1);
}

#[test]
fn second_room_takes_overflow() {
    let mut config = config();
    config.rooms.count = 2;
    config.rooms.max_players = 1;
    let mut game = GameState::new(&config);
    let (s1, mut rx1) = open(&mut game);
    let (s2, mut rx2) = open(&mut game);
    let a = join(&mut game, s1, &mut rx1, "a");
    let b = join(&mut game, s2, &mut rx2, "b");
    assert_eq!(game.players.get(&a).unwrap().room_id, 1);
    assert_eq!(game.players.get(&b).unwrap().room_id, 2);
}

#[test]
fn match_ends_then_resets() {
    let t0 = Instant::now();
    let mut game = GameState::new_at(&config(), t0);
    let (s1, mut rx1) = open(&mut game);
    let (s2, mut rx2) = open(&mut game);
    let big = join(&mut game, s1, &mut rx1, "big");
    let small = join(&mut game, s2, &mut rx2, "small");
    send(&mut game, s1, json!({ "type": "sizeChanged", "id": big, "roomId": 1, "newSize": 120.0 }));
    send(&mut game, s2, json!({ "type": "sizeChanged", "id": small, "roomId": 1, "newSize": 80.0 }));

    // countdown
    let effects = game.clock_tick(t0 + SEC);
    game.deliver(effects);
    assert_eq!(drain(&mut rx1), vec![json!({ "type": "timeUpdate", "timeLeft": 29_000 })]);
    assert_eq!(drain(&mut rx2), vec![json!({ "type": "timeUpdate", "timeLeft": 29_000 })]);

    // eat some food so the reset has something to restore
    let target = {
        let room = game.room(1).unwrap();
        room.grid
            .chunks()
            .iter()
            .find_map(|c| room.index.food(c.id).first().map(|f| f.position))
            .unwrap()
    };
    move_to(&mut game, s1, big, target.x, target.y);
    send(
        &mut game,
        s1,
        json!({ "type": "sizeChanged", "id": big, "roomId": 1, "newSize": 120.0, "food": { "x": target.x, "y": target.y } }),
    );
    assert_eq!(game.room(1).unwrap().food.count(), 1999);

    // game over
    let effects = game.clock_tick(t0 + 30 * SEC);
    game.deliver(effects);
    let results = json!({
        "type": "gameOver",
        "results": [
            { "username": "small", "size": 80.0 },
            { "username": "big", "size": 120.0 },
        ]
    });
    assert_eq!(drain(&mut rx1), vec![results.clone()]);
    assert_eq!(drain(&mut rx2), vec![results]);
    assert!(game.room(1).unwrap().is_ended());

    // frozen while ended
    let frozen_at = game.players.get(&big).unwrap().position;
    move_to(&mut game, s1, big, 0.0, 0.0);
    assert_eq!(game.players.get(&big).unwrap().position, frozen_at);
    send(&mut game, s2, json!({ "type": "playerEaten", "roomId": 1, "eater": small, "eaten": big }));
    assert!(game.players.contains(&big));
    assert!(game.tick().is_empty());

    // still waiting
    assert!(game.clock_tick(t0 + 35 * SEC).is_empty());
    assert_eq!(game.room(1).unwrap().clock.phase(), server::room::MatchPhase::Ended { ended_at: t0 + 30 * SEC });

    // reset
    let effects = game.clock_tick(t0 + 40 * SEC);
    game.deliver(effects);
    for (rx, id) in [(&mut rx1, big), (&mut rx2, small)] {
        let frames = drain(rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "roomReset");
        assert_eq!(frames[0]["size"], 60.0);
        let player = game.players.get(&id).unwrap();
        assert_eq!(player.size, 60.0);
        assert_eq!(frames[0]["position"]["x"].as_f64().unwrap() as f32, player.position.x);
        assert_eq!(chunk_ids(&frames[0])[0], player.chunk_id as u64);
    }
    let room = game.room(1).unwrap();
    assert!(!room.is_ended());
    assert_eq!(room.food.count(), 2000);
    assert_eq!(room.index.food_len(), 2000);
    assert_eq!(room.player_count(), 2);

    // the new match counts down from the reset
    let mut clock = room.clock.clone();
    assert_eq!(clock.poll(t0 + 41 * SEC), ClockEvent::TimeLeft(29 * SEC));
}

#[test]
fn dropped_connection_is_disconnected_on_send() {
    let mut game = GameState::new(&config());
    let (s1, mut rx1) = open(&mut game);
    let (s2, rx2) = open(&mut game);
    let a = join(&mut game, s1, &mut rx1, "a");
    send(&mut game, s2, json!({ "type": "connect", "username": "b" }));
    drop(rx2);

    let effects = game.tick();
    game.deliver(effects);

    assert_eq!(game.players.len(), 1);
    assert!(game.players.contains(&a));
    assert_eq!(game.room(1).unwrap().player_count(), 1);
    assert_eq!(game.sessions.len(), 1);
    assert!(!drain(&mut rx1).is_empty());
}

#[test]
fn socket_close_removes_bound_players() {
    let mut game = GameState::new(&config());
    let (s, mut rx) = open(&mut game);
    join(&mut game, s, &mut rx, "a");
    join(&mut game, s, &mut rx, "b");
    assert_eq!(game.room(1).unwrap().player_count(), 2);

    game.close_session(s);
    assert!(game.players.is_empty());
    assert_eq!(game.room(1).unwrap().player_count(), 0);
    game.close_session(s);
}

#[test]
fn malformed_messages_do_not_disturb_state() {
    let mut game = GameState::new(&config());
    let (s, mut rx) = open(&mut game);

    assert!(game.handle_message(s, "{").is_err());
    assert!(game.handle_message(s, r#"{"type":"fly"}"#).is_err());
    assert!(game.handle_message(s, r#"{"type":"positionChanged","id":"nope","roomId":1}"#).is_err());
    assert!(drain(&mut rx).is_empty());

    join(&mut game, s, &mut rx, "after");
    assert_eq!(game.players.len(), 1);
}

#[test]
fn moves_on_uneven_grid_keep_owning_chunk() {
    let mut config = config();
    config.world.chunks_per_axis = 12;
    let mut game = GameState::new(&config);
    let (s, mut rx) = open(&mut game);
    let id = join(&mut game, s, &mut rx, "edge");

    for (x, y) in [(50_000.0, 50_000.0), (-50_000.0, 50_000.0), (0.0, 0.0), (10_000.0, -10_000.0), (-10_000.0, -10_000.0)] {
        move_to(&mut game, s, id, x, y);
        let player = game.players.get(&id).unwrap();
        let room = game.room(1).unwrap();
        assert!(room.grid.contains(player.chunk_id, player.position), "{x},{y}");
        assert_eq!(room.index.players(player.chunk_id), &[id]);
    }
    assert_eq!(game.players.get(&id).unwrap().chunk_id, 0);
}
