//! Property tests for the change vocabulary and the board mutator.
//!
//! Random changes of every tag must survive their structured and textual
//! encodings unchanged, and must never write a field that holds its default.
//! Random change streams (including off-board subjects) must never panic the
//! board or leave it in a state that differs between a direct and a wire-fed
//! copy.

use std::collections::BTreeSet;

use proptest::prelude::*;
use proptest::strategy::ValueTree;
use proptest::test_runner::TestRunner;
use serde_json::Value;
use umbra_board::change::WIRE_NAMES;
use umbra_board::prelude::*;

// ---------------------------------------------------------------------------
// Field strategies
// ---------------------------------------------------------------------------

fn player_strategy() -> impl Strategy<Value = Player> {
    (0..Player::COUNT).prop_map(|i| Player::ALL[i])
}

fn vision_strategy() -> impl Strategy<Value = Vision> {
    prop_oneof![Just(Vision::none()), any::<u16>().prop_map(Vision::from_bits)]
}

/// A positioned descriptor; never the none descriptor.
fn descriptor_strategy() -> impl Strategy<Value = Descriptor> {
    let kind = prop_oneof![
        Just(DescriptorKind::Cell),
        Just(DescriptorKind::Tile),
        Just(DescriptorKind::Ground),
        Just(DescriptorKind::Air),
        Just(DescriptorKind::Bypass),
    ];
    (kind, -1i16..7, -1i16..7).prop_map(|(k, row, col)| Descriptor::new(k, Position::new(row, col)))
}

/// An order target, which may be left out.
fn target_strategy() -> impl Strategy<Value = Descriptor> {
    prop_oneof![Just(Descriptor::NONE), descriptor_strategy()]
}

fn tiletype_strategy() -> impl Strategy<Value = TileType> {
    prop_oneof![Just(""), Just("grass"), Just("city"), Just("town"), Just("farm")].prop_map(TileType::new)
}

fn unittype_strategy() -> impl Strategy<Value = UnitType> {
    prop_oneof![Just(""), Just("rifleman"), Just("tank"), Just("zeppelin")].prop_map(UnitType::new)
}

/// A unit that is really there; unit-carrying tags always name one.
fn unit_strategy() -> impl Strategy<Value = UnitToken> {
    (
        prop_oneof![Just("rifleman"), Just("tank"), Just("zeppelin")],
        proptest::option::of(player_strategy()),
        0u8..4,
    )
        .prop_map(|(kind, owner, stacks)| UnitToken::new(UnitType::new(kind), owner, stacks))
}

fn tile_strategy() -> impl Strategy<Value = TileToken> {
    (
        tiletype_strategy(),
        proptest::option::of(player_strategy()),
        0u8..4,
        0u8..4,
    )
        .prop_map(|(kind, owner, stacks, power)| TileToken::new(kind, owner, stacks, power))
}

fn hazards_strategy() -> impl Strategy<Value = Hazards> {
    (-3i8..4, 0i8..3, any::<bool>(), any::<bool>()).prop_map(|(temperature, gas, snow, death)| {
        Hazards {
            temperature,
            gas,
            snow,
            death,
            ..Hazards::default()
        }
    })
}

fn hit_strategy() -> impl Strategy<Value = Hit> {
    (descriptor_strategy(), any::<bool>(), any::<bool>())
        .prop_map(|(d, killed, depowered)| Hit::new(d, killed, depowered))
}

fn phase_strategy() -> impl Strategy<Value = Phase> {
    prop_oneof![
        Just(Phase::Growth),
        Just(Phase::Action),
        Just(Phase::Resting),
        Just(Phase::Planning),
        Just(Phase::Staging),
        Just(Phase::Decay),
    ]
}

fn season_strategy() -> impl Strategy<Value = Season> {
    prop_oneof![
        Just(Season::Spring),
        Just(Season::Summer),
        Just(Season::Autumn),
        Just(Season::Winter),
    ]
}

fn daytime_strategy() -> impl Strategy<Value = Daytime> {
    prop_oneof![Just(Daytime::Early), Just(Daytime::Late)]
}

// ---------------------------------------------------------------------------
// Change strategies, one per family
// ---------------------------------------------------------------------------

fn movement_changes() -> impl Strategy<Value = Change> {
    prop_oneof![
        descriptor_strategy().prop_map(|subject| Change::Starts { subject }),
        (descriptor_strategy(), descriptor_strategy())
            .prop_map(|(subject, target)| Change::Moves { subject, target }),
        (descriptor_strategy(), unit_strategy())
            .prop_map(|(subject, unit)| Change::Entered { subject, unit }),
        descriptor_strategy().prop_map(|subject| Change::Exited { subject }),
        descriptor_strategy().prop_map(|subject| Change::Died { subject }),
        descriptor_strategy().prop_map(|subject| Change::Survived { subject }),
    ]
}

fn fog_changes() -> impl Strategy<Value = Change> {
    let cell = prop_oneof![
        Just(Cell::default()),
        (tile_strategy(), unit_strategy(), hazards_strategy(), any::<bool>()).prop_map(
            |(tile, ground, hazards, border)| Cell {
                tile,
                ground,
                hazards,
                border,
                ..Cell::default()
            }
        ),
    ];
    prop_oneof![
        (descriptor_strategy(), cell, vision_strategy())
            .prop_map(|(subject, cell, vision)| Change::Reveal { subject, cell, vision }),
        (descriptor_strategy(), vision_strategy())
            .prop_map(|(subject, vision)| Change::Obscure { subject, vision }),
        (descriptor_strategy(), vision_strategy())
            .prop_map(|(subject, vision)| Change::Vision { subject, vision }),
    ]
}

fn tile_changes() -> impl Strategy<Value = Change> {
    let d = descriptor_strategy;
    prop_oneof![
        (d(), tile_strategy()).prop_map(|(subject, tile)| Change::Transformed { subject, tile }),
        d().prop_map(|subject| Change::Consumed { subject }),
        (d(), tile_strategy()).prop_map(|(subject, tile)| Change::Destroyed { subject, tile }),
        (d(), -2i8..3, -2i8..3)
            .prop_map(|(subject, stacks, power)| Change::Grows { subject, stacks, power }),
        (d(), tiletype_strategy()).prop_map(|(subject, tiletype)| Change::Shapes { subject, tiletype }),
        (d(), tile_strategy()).prop_map(|(subject, tile)| Change::Shaped { subject, tile }),
        (d(), tiletype_strategy()).prop_map(|(subject, tiletype)| Change::Settles { subject, tiletype }),
        (d(), tile_strategy()).prop_map(|(subject, tile)| Change::Settled { subject, tile }),
        (d(), target_strategy(), tiletype_strategy()).prop_map(|(subject, target, tiletype)| {
            Change::Expands {
                subject,
                target,
                tiletype,
            }
        }),
        (d(), tile_strategy()).prop_map(|(subject, tile)| Change::Expanded { subject, tile }),
        (d(), tiletype_strategy()).prop_map(|(subject, tiletype)| Change::Upgrades { subject, tiletype }),
        (d(), tile_strategy()).prop_map(|(subject, tile)| Change::Upgraded { subject, tile }),
        (d(), target_strategy(), tiletype_strategy()).prop_map(|(subject, target, tiletype)| {
            Change::Cultivates {
                subject,
                target,
                tiletype,
            }
        }),
        (d(), tile_strategy()).prop_map(|(subject, tile)| Change::Cultivated { subject, tile }),
        (d(), target_strategy()).prop_map(|(subject, target)| Change::Captures { subject, target }),
        (d(), player_strategy()).prop_map(|(subject, player)| Change::Captured { subject, player }),
        (d(), target_strategy(), unittype_strategy()).prop_map(|(subject, target, unittype)| {
            Change::Produces {
                subject,
                target,
                unittype,
            }
        }),
        (d(), unit_strategy()).prop_map(|(subject, unit)| Change::Produced { subject, unit }),
    ]
}

fn combat_changes() -> impl Strategy<Value = Change> {
    let pair = || (descriptor_strategy(), target_strategy());
    prop_oneof![
        pair().prop_map(|(subject, target)| Change::Aims { subject, target }),
        pair().prop_map(|(subject, target)| Change::Attacks { subject, target }),
        hit_strategy().prop_map(Change::Attacked),
        pair().prop_map(|(subject, target)| Change::Tramples { subject, target }),
        hit_strategy().prop_map(Change::Trampled),
        pair().prop_map(|(subject, target)| Change::Shells { subject, target }),
        hit_strategy().prop_map(Change::Shelled),
        pair().prop_map(|(subject, target)| Change::Bombards { subject, target }),
        hit_strategy().prop_map(Change::Bombarded),
        pair().prop_map(|(subject, target)| Change::Bombs { subject, target }),
        hit_strategy().prop_map(Change::Bombed),
        hit_strategy().prop_map(Change::Frostbitten),
        hit_strategy().prop_map(Change::Burned),
        hit_strategy().prop_map(Change::Gassed),
        hit_strategy().prop_map(Change::Irradiated),
    ]
}

fn hazard_changes() -> impl Strategy<Value = Change> {
    let flag = || (descriptor_strategy(), any::<bool>());
    let delta = || (descriptor_strategy(), -5i8..6);
    prop_oneof![
        flag().prop_map(|(subject, snow)| Change::Snow { subject, snow }),
        flag().prop_map(|(subject, frostbite)| Change::Frostbite { subject, frostbite }),
        flag().prop_map(|(subject, firestorm)| Change::Firestorm { subject, firestorm }),
        flag().prop_map(|(subject, bonedrought)| Change::Bonedrought { subject, bonedrought }),
        flag().prop_map(|(subject, death)| Change::Death { subject, death }),
        delta().prop_map(|(subject, gas)| Change::Gas { subject, gas }),
        delta().prop_map(|(subject, radiation)| Change::Radiation { subject, radiation }),
        delta().prop_map(|(subject, temperature)| Change::Temperature { subject, temperature }),
        delta().prop_map(|(subject, humidity)| Change::Humidity { subject, humidity }),
        delta().prop_map(|(subject, chaos)| Change::Chaos { subject, chaos }),
    ]
}

fn bookkeeping_changes() -> impl Strategy<Value = Change> {
    let money = || (player_strategy(), -50i32..50);
    prop_oneof![
        prop_oneof![Just(0i16), 1i16..40].prop_map(|year| Change::Year { year }),
        season_strategy().prop_map(|season| Change::Season { season }),
        daytime_strategy().prop_map(|daytime| Change::Daytime { daytime }),
        phase_strategy().prop_map(|phase| Change::Phase { phase }),
        money().prop_map(|(player, money)| Change::Funds { player, money }),
        money().prop_map(|(player, money)| Change::Income { player, money }),
        money().prop_map(|(player, money)| Change::Expenditure { player, money }),
    ]
}

fn lifecycle_changes() -> impl Strategy<Value = Change> {
    let p = player_strategy;
    let d = descriptor_strategy;
    prop_oneof![
        p().prop_map(|player| Change::Ordered { player }),
        p().prop_map(|player| Change::Sleeping { player }),
        p().prop_map(|player| Change::Acting { player }),
        p().prop_map(|player| Change::Initiative { player }),
        p().prop_map(|player| Change::Finished { player }),
        d().prop_map(|subject| Change::Discarded { subject }),
        d().prop_map(|subject| Change::Postponed { subject }),
        d().prop_map(|subject| Change::Unfinished { subject }),
    ]
}

fn terminal_changes() -> impl Strategy<Value = Change> {
    prop_oneof![
        (0i16..6, 0i16..6).prop_map(|(row, col)| Change::Corner {
            subject: Descriptor::cell(Position::new(row, col))
        }),
        descriptor_strategy().prop_map(|subject| Change::Border { subject }),
        (player_strategy(), -20i32..20).prop_map(|(player, score)| Change::Scored { player, score }),
        player_strategy().prop_map(|player| Change::Defeat { player }),
        player_strategy().prop_map(|player| Change::Victory { player }),
        Just(Change::Gameover),
        (player_strategy(), 0u8..4).prop_map(|(player, stars)| Change::Award { player, stars }),
    ]
}

fn change_strategy() -> impl Strategy<Value = Change> {
    prop_oneof![
        movement_changes(),
        fog_changes(),
        tile_changes(),
        combat_changes(),
        hazard_changes(),
        bookkeeping_changes(),
        lifecycle_changes(),
        terminal_changes(),
    ]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Paths of every written field that holds its type's default. Descriptor
/// coordinates are exempt: a positioned descriptor always carries both.
fn default_fields(value: &Value, path: &str, found: &mut Vec<String>) {
    let Some(object) = value.as_object() else {
        return;
    };
    for (key, field) in object {
        if matches!(key.as_str(), "type" | "row" | "col") {
            continue;
        }
        let path = format!("{path}.{key}");
        let holds_default = match field {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(inner) => {
                inner.is_empty() || (inner.len() == 1 && inner.get("type") == Some(&Value::from("none")))
            }
        };
        if holds_default {
            found.push(path.clone());
        }
        default_fields(field, &path, found);
    }
}

#[test]
fn strategy_covers_every_tag() {
    let mut runner = TestRunner::deterministic();
    let strategy = change_strategy();
    let mut seen = BTreeSet::new();
    for _ in 0..20_000 {
        let change = strategy.new_tree(&mut runner).unwrap().current();
        seen.insert(change.wire_name());
    }
    let missing: Vec<&str> = WIRE_NAMES.iter().copied().filter(|n| !seen.contains(n)).collect();
    assert!(missing.is_empty(), "never generated: {missing:?}");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn structured_encoding_round_trips(change in change_strategy()) {
        let back = Change::parse(&change.to_value()).unwrap();
        prop_assert_eq!(back, change);
    }

    #[test]
    fn textual_encoding_round_trips(change in change_strategy()) {
        let text = change.to_string();
        let back: Change = text.parse().unwrap();
        prop_assert_eq!(back, change);
    }

    #[test]
    fn default_fields_are_never_written(change in change_strategy()) {
        let value = change.to_value();
        let mut found = Vec::new();
        default_fields(&value, "", &mut found);
        prop_assert!(found.is_empty(), "{} wrote defaults at {:?}", value, found);

        let object = value.as_object().unwrap();
        match &change {
            Change::Year { year } => prop_assert_eq!(object.contains_key("year"), *year != 0),
            Change::Season { season } => {
                prop_assert_eq!(object.contains_key("season"), *season != Season::default());
            }
            Change::Daytime { daytime } => {
                prop_assert_eq!(object.contains_key("daytime"), *daytime != Daytime::default());
            }
            _ => {}
        }
    }

    #[test]
    fn wire_name_is_the_type_tag(change in change_strategy()) {
        let value = change.to_value();
        prop_assert_eq!(value["type"].as_str(), Some(change.wire_name()));
    }

    #[test]
    fn random_streams_never_panic_and_replicate(
        changes in proptest::collection::vec(
            change_strategy().prop_filter("fixed board size", |c| !matches!(c, Change::Corner { .. })),
            0..80,
        ),
    ) {
        let bible = Bible::standard();
        let mut direct = Board::new(&bible, Player::Observer);
        let mut wired = Board::new(&bible, Player::Observer);
        direct.clear(5, 5);
        wired.clear(5, 5);

        for change in &changes {
            direct.enact(change);
            wired.enact(&Change::parse_str(&change.to_string()).unwrap());
        }

        prop_assert_eq!(direct.checksum(), wired.checksum());
        prop_assert_eq!((direct.rows(), direct.cols()), (5, 5));
        for pos in direct.positions() {
            let gas = direct.cell(pos).hazards.gas;
            prop_assert!((bible.gas_min()..=bible.gas_max()).contains(&gas));
        }
    }

    #[test]
    fn vision_operations_are_set_algebra(a in vision_strategy(), b in vision_strategy()) {
        let union = a.union(b);
        let inter = a.intersection(b);
        for p in Player::ALL {
            prop_assert_eq!(union.contains(p), a.contains(p) || b.contains(p));
            prop_assert_eq!(inter.contains(p), a.contains(p) && b.contains(p));
            prop_assert_eq!(a.difference(b).contains(p), a.contains(p) && !b.contains(p));
        }
        prop_assert_eq!(union.len(), a.len() + b.len() - inter.len());
    }

    #[test]
    fn self_framing_moves_exactly_one_bit(v in vision_strategy(), color in 0usize..8) {
        let color = Player::COLORS[color];
        let framed = v.with_self(color);
        prop_assert!(!framed.contains(color));
        prop_assert_eq!(
            framed.contains(Player::Myself),
            v.contains(color) || v.contains(Player::Myself)
        );
    }
}
