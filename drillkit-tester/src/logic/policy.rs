use std::fmt;

use drillkit_game::{
    GameDefinition, Intent, IntentSource, ItemId, Location, PlacementSnapshot, Point, Response,
    Variant, Zone,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Offset that pushes a careless drop well outside every proximity band.
const CARELESS_OFFSET: f64 = 250.0;
const IDLE_TICKS: u32 = 3;

/// Built-in play strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayStrategy {
    /// Follows the ground truth exactly.
    Perfect,
    /// Seeded random moves, links and answers.
    Random,
    /// Deliberately wrong on every decision.
    Careless,
    /// Starts the clock and does nothing else.
    Idle,
}

impl PlayStrategy {
    pub const ALL: [Self; 4] = [Self::Perfect, Self::Random, Self::Careless, Self::Idle];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Random => "random",
            Self::Careless => "careless",
            Self::Idle => "idle",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.label().eq_ignore_ascii_case(label))
    }

    /// Intent source playing `game` under this strategy.
    #[must_use]
    pub fn create_policy(self, game: &GameDefinition, seed: u64) -> Box<dyn IntentSource> {
        match self {
            Self::Perfect => Box::new(perfect_script(game).into_iter()),
            Self::Random => Box::new(RandomPolicy::new(game, seed)),
            Self::Careless => Box::new(careless_script(game).into_iter()),
            Self::Idle => Box::new(idle_script(game).into_iter()),
        }
    }
}

impl fmt::Display for PlayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pair members in declaration order, each pair once.
fn pair_groups(game: &GameDefinition) -> Vec<(ItemId, ItemId)> {
    let mut groups = Vec::new();
    for (index, item) in game.items.iter().enumerate() {
        let Some(pair) = &item.pair else {
            continue;
        };
        if let Some(partner) = game.items[index + 1..]
            .iter()
            .find(|other| other.pair.as_ref() == Some(pair))
        {
            groups.push((item.id.clone(), partner.id.clone()));
        }
    }
    groups
}

fn drop_into(zone: &Zone, item: &ItemId, point: Point) -> Intent {
    if zone.spatial {
        Intent::PlaceAt {
            item: item.clone(),
            zone: zone.id.clone(),
            point,
        }
    } else {
        Intent::Move {
            item: item.clone(),
            to: Location::Zone(zone.id.clone()),
        }
    }
}

fn perfect_script(game: &GameDefinition) -> Vec<Intent> {
    if let Variant::Sequential(set) = &game.variant {
        return set
            .rounds
            .iter()
            .map(|round| Intent::Answer {
                response: round.expected.clone(),
            })
            .collect();
    }

    let mut script: Vec<Intent> = game
        .items
        .iter()
        .filter_map(|item| {
            let zone = game.zones.iter().find(|zone| Some(&zone.id) == item.zone.as_ref())?;
            Some(drop_into(zone, &item.id, item.target.unwrap_or(Point::new(0.0, 0.0))))
        })
        .collect();
    script.extend(pair_groups(game).into_iter().map(|(a, b)| Intent::Link { a, b }));
    script.push(Intent::Finalize);
    script
}

fn wrong_answer(expected: &Response, options: &[String]) -> Response {
    match expected {
        Response::Choice(answer) => Response::Choice(
            options
                .iter()
                .find(|option| *option != answer)
                .cloned()
                .unwrap_or_default(),
        ),
        Response::Sequence(steps) => Response::Sequence(steps.iter().rev().cloned().collect()),
        Response::Set(members) => Response::Set(
            options
                .iter()
                .filter(|option| !members.contains(option))
                .take(members.len())
                .cloned()
                .collect(),
        ),
    }
}

fn careless_script(game: &GameDefinition) -> Vec<Intent> {
    if let Variant::Sequential(set) = &game.variant {
        return set
            .rounds
            .iter()
            .map(|round| Intent::Answer {
                response: wrong_answer(&round.expected, &round.options),
            })
            .collect();
    }

    let mut script = Vec::new();
    for item in &game.items {
        let far = item
            .target
            .map_or(Point::new(0.0, 0.0), |t| Point::new(t.x + CARELESS_OFFSET, t.y + CARELESS_OFFSET));
        let wrong_zone = match &item.zone {
            Some(right) => game.zones.iter().find(|zone| &zone.id != right),
            None => game.zones.first(),
        };
        match wrong_zone {
            Some(zone) => script.push(drop_into(zone, &item.id, far)),
            None => match game.zones.iter().find(|zone| zone.spatial) {
                Some(zone) => script.push(drop_into(zone, &item.id, far)),
                None if !game.zones.is_empty() => script.push(Intent::Mistake),
                None => {}
            },
        }
    }

    let groups = pair_groups(game);
    if game.zones.is_empty() && groups.len() > 1 {
        for (index, (a, _)) in groups.iter().enumerate() {
            let (_, wrong) = &groups[(index + 1) % groups.len()];
            script.push(Intent::Link {
                a: a.clone(),
                b: wrong.clone(),
            });
        }
    }
    script.push(Intent::Finalize);
    script
}

fn idle_script(game: &GameDefinition) -> Vec<Intent> {
    let ticks = game.variant.countdown().unwrap_or(IDLE_TICKS);
    let mut script = vec![Intent::Start];
    script.extend((0..ticks).map(|_| Intent::Tick));
    script.push(Intent::Finalize);
    script
}

/// Seeded random player. Spends a fixed budget of intents, then tries to
/// finalize once.
pub struct RandomPolicy {
    rng: ChaCha20Rng,
    zones: Vec<Zone>,
    expected: Vec<Response>,
    budget: usize,
    finalized: bool,
}

impl RandomPolicy {
    #[must_use]
    pub fn new(game: &GameDefinition, seed: u64) -> Self {
        let expected = game
            .variant
            .rounds()
            .map(|set| set.rounds.iter().map(|round| round.expected.clone()).collect())
            .unwrap_or_default();
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            zones: game.zones.clone(),
            expected,
            budget: game.items.len() * 3 + 8,
            finalized: false,
        }
    }

    fn random_answer(&mut self, index: usize, options: &[String]) -> Response {
        let rng = &mut self.rng;
        match self.expected.get(index) {
            Some(Response::Sequence(steps)) => {
                let mut picked: Vec<String> = options.to_vec();
                picked.shuffle(rng);
                picked.truncate(steps.len());
                Response::Sequence(picked)
            }
            Some(Response::Set(members)) => Response::Set(
                options
                    .choose_multiple(rng, members.len())
                    .cloned()
                    .collect(),
            ),
            _ => Response::Choice(options.choose(rng).cloned().unwrap_or_default()),
        }
    }

    fn random_placement(&mut self, snapshot: &PlacementSnapshot) -> Option<Intent> {
        let items: Vec<&ItemId> = snapshot.pools.iter().flat_map(|pool| pool.items.iter()).collect();
        let item = (*items.choose(&mut self.rng)?).clone();

        if self.rng.gen_bool(0.1) {
            return Some(Intent::Tick);
        }
        if self.zones.is_empty() || self.rng.gen_bool(0.2) {
            let other = (*items.choose(&mut self.rng)?).clone();
            return Some(Intent::Link { a: item, b: other });
        }

        let slot = self.rng.gen_range(0..=self.zones.len());
        let Some(zone) = slot.checked_sub(1).and_then(|index| self.zones.get(index)) else {
            return Some(Intent::Move {
                item,
                to: Location::Unsorted,
            });
        };
        let point = Point::new(self.rng.gen_range(0.0..400.0), self.rng.gen_range(0.0..250.0));
        Some(drop_into(zone, &item, point))
    }
}

impl IntentSource for RandomPolicy {
    fn next_intent(&mut self, snapshot: &PlacementSnapshot) -> Option<Intent> {
        if self.budget == 0 {
            if self.finalized {
                return None;
            }
            self.finalized = true;
            return Some(Intent::Finalize);
        }
        self.budget -= 1;

        if let Some(round) = &snapshot.round {
            let response = self.random_answer(round.index, &round.options);
            return Some(Intent::Answer { response });
        }
        self.random_placement(snapshot).or_else(|| {
            self.budget = 0;
            self.finalized = true;
            Some(Intent::Finalize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillkit_game::{GameLibrary, Phase};

    fn library() -> GameLibrary {
        GameLibrary::load_from_static().unwrap()
    }

    #[test]
    fn labels_round_trip() {
        for strategy in PlayStrategy::ALL {
            assert_eq!(PlayStrategy::from_label(strategy.label()), Some(strategy));
        }
        assert_eq!(PlayStrategy::from_label("PERFECT"), Some(PlayStrategy::Perfect));
        assert!(PlayStrategy::from_label("genius").is_none());
    }

    #[test]
    fn perfect_script_links_each_pair_once() {
        let library = library();
        let game = library.get("tool_matcher").unwrap();
        let links = perfect_script(game)
            .iter()
            .filter(|intent| matches!(intent, Intent::Link { .. }))
            .count();
        assert_eq!(links, 6);
    }

    #[test]
    fn careless_answers_differ_from_expected() {
        let options: Vec<String> = ["a", "b", "c"].map(String::from).to_vec();
        assert_eq!(
            wrong_answer(&Response::Choice("a".into()), &options),
            Response::Choice("b".into())
        );
        assert_eq!(
            wrong_answer(&Response::Set(vec!["a".into(), "b".into()]), &options),
            Response::Set(vec!["c".into()])
        );
    }

    #[test]
    fn random_policy_is_reproducible() {
        let library = library();
        let game = library.get("hazard_sort").unwrap();
        let run = || {
            let mut session = game.build_session(5).unwrap();
            let mut policy = PlayStrategy::Random.create_policy(game, 5);
            let report = session.drive(&mut policy, 128);
            (report, session.snapshot())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn idle_only_finishes_timed_games() {
        let library = library();
        for id in ["emergency_bag_timer", "hazard_sort"] {
            let game = library.get(id).unwrap();
            let mut session = game.build_session(1).unwrap();
            let mut policy = PlayStrategy::Idle.create_policy(game, 1);
            session.drive(&mut policy, 64);
            let timed = game.variant.countdown().is_some();
            assert_eq!(session.phase() == Phase::Completed, timed, "{id}");
        }
    }
}
