#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Arena Rounds engine.
//!
//! This crate defines the message surface that connects the host world, the
//! round orchestrator, and the pure systems. Systems read immutable views of
//! the world through the [`ArenaWorld`] trait and respond exclusively with
//! [`Command`] values; the host executes those commands via
//! [`ArenaWorld::apply`] and reports what happened as [`Event`] values.

mod clock;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use clock::{ManualTickClock, ManualWallClock, SystemWallClock, TickClock, WallClock};

/// Number of fighters assigned to each team.
pub const TEAM_SIZE: usize = 10;

/// Number of identities required to populate both teams of a round.
pub const ROSTER_SIZE: usize = TEAM_SIZE * 2;

/// Distance in cells at which a melee attack can connect.
pub const MELEE_REACH: u32 = 1;

/// Namespace attached to every anchor structure created by the arena.
pub const ANCHOR_NAMESPACE: &str = "arena_rounds::anchor";

/// Location of a single grid cell on the horizontal plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    z: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Column of the cell along the x axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the cell along the z axis.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Squared Euclidean distance between two cell coordinates.
    #[must_use]
    pub fn distance_squared(self, other: CellCoord) -> u64 {
        let dx = u64::from(self.x.abs_diff(other.x));
        let dz = u64::from(self.z.abs_diff(other.z));
        dx * dx + dz * dz
    }

    /// Returns the neighbouring cell one step closer to `target`, preferring the longer axis.
    #[must_use]
    pub fn step_toward(self, target: CellCoord) -> CellCoord {
        let dx = target.x - self.x;
        let dz = target.z - self.z;
        if dx == 0 && dz == 0 {
            return self;
        }

        if dx.abs() >= dz.abs() {
            CellCoord::new(self.x + dx.signum(), self.z)
        } else {
            CellCoord::new(self.x, self.z + dz.signum())
        }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Dimensions of the host map measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapSize {
    width: u32,
    depth: u32,
}

impl MapSize {
    /// Creates a new map size descriptor.
    #[must_use]
    pub const fn new(width: u32, depth: u32) -> Self {
        Self { width, depth }
    }

    /// Number of cells along the x axis.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of cells along the z axis.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Reports whether the cell lies inside `[0, width) x [0, depth)`.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x() >= 0
            && cell.z() >= 0
            && (cell.x() as i64) < i64::from(self.width)
            && (cell.z() as i64) < i64::from(self.depth)
    }
}

/// Axis-aligned rectangle of cells enclosing the arena.
///
/// Both limits are inclusive. [`ArenaBounds::width`] and
/// [`ArenaBounds::height`] are measured edge to edge (`max - min`), so a
/// rectangle spanning `x: [30, 70]` reports a width of 40 while covering 41
/// columns of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArenaBounds {
    min: CellCoord,
    max: CellCoord,
}

impl ArenaBounds {
    /// Constructs bounds from inclusive limits, normalising swapped edges.
    #[must_use]
    pub fn from_limits(min_x: i32, min_z: i32, max_x: i32, max_z: i32) -> Self {
        Self {
            min: CellCoord::new(min_x.min(max_x), min_z.min(max_z)),
            max: CellCoord::new(min_x.max(max_x), min_z.max(max_z)),
        }
    }

    /// Lowest corner of the rectangle.
    #[must_use]
    pub const fn min(&self) -> CellCoord {
        self.min
    }

    /// Highest corner of the rectangle.
    #[must_use]
    pub const fn max(&self) -> CellCoord {
        self.max
    }

    /// Edge-to-edge extent along the x axis.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.max.x().abs_diff(self.min.x())
    }

    /// Edge-to-edge extent along the z axis.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.max.z().abs_diff(self.min.z())
    }

    /// Reports whether the cell lies inside the rectangle, edges included.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.x() >= self.min.x()
            && cell.x() <= self.max.x()
            && cell.z() >= self.min.z()
            && cell.z() <= self.max.z()
    }

    /// Cell closest to the geometric center of the rectangle.
    #[must_use]
    pub fn center(&self) -> CellCoord {
        CellCoord::new(
            self.min.x() + (self.max.x() - self.min.x()) / 2,
            self.min.z() + (self.max.z() - self.min.z()) / 2,
        )
    }

    /// Number of cells covered by the rectangle.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        (u64::from(self.width()) + 1) * (u64::from(self.height()) + 1)
    }

    /// Iterates every covered cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let min = self.min;
        let max = self.max;
        (min.z()..=max.z()).flat_map(move |z| (min.x()..=max.x()).map(move |x| CellCoord::new(x, z)))
    }
}

/// Participating side in a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Team {
    /// First team, populated from the first half of the roster.
    A,
    /// Second team, populated from the second half of the roster.
    B,
}

impl Team {
    /// Both teams in roster order.
    pub const ALL: [Team; 2] = [Team::A, Team::B];

    /// Returns the opposing team.
    #[must_use]
    pub const fn opponent(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::A => write!(f, "TeamA"),
            Team::B => write!(f, "TeamB"),
        }
    }
}

/// Kinds of anchor structures that pin the arena to the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnchorKind {
    /// Central structure of the arena.
    Core,
    /// Spawn point for [`Team::A`].
    TeamASpawn,
    /// Spawn point for [`Team::B`].
    TeamBSpawn,
}

impl AnchorKind {
    /// Every anchor kind required for a usable arena.
    pub const ALL: [AnchorKind; 3] = [AnchorKind::Core, AnchorKind::TeamASpawn, AnchorKind::TeamBSpawn];

    /// Definition name used when the anchor is placed in the world.
    #[must_use]
    pub const fn def_name(self) -> &'static str {
        match self {
            AnchorKind::Core => "ArenaCore",
            AnchorKind::TeamASpawn => "ArenaSpawnTeamA",
            AnchorKind::TeamBSpawn => "ArenaSpawnTeamB",
        }
    }

    /// Spawn anchor associated with the provided team.
    #[must_use]
    pub const fn spawn_for(team: Team) -> AnchorKind {
        match team {
            Team::A => AnchorKind::TeamASpawn,
            Team::B => AnchorKind::TeamBSpawn,
        }
    }
}

/// Positions of the three anchor structures, any of which may be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorTriad {
    core: Option<CellCoord>,
    team_a_spawn: Option<CellCoord>,
    team_b_spawn: Option<CellCoord>,
}

impl AnchorTriad {
    /// Creates a triad from explicit anchor positions.
    #[must_use]
    pub const fn new(
        core: Option<CellCoord>,
        team_a_spawn: Option<CellCoord>,
        team_b_spawn: Option<CellCoord>,
    ) -> Self {
        Self {
            core,
            team_a_spawn,
            team_b_spawn,
        }
    }

    /// Position of the requested anchor, if placed.
    #[must_use]
    pub const fn position(&self, kind: AnchorKind) -> Option<CellCoord> {
        match kind {
            AnchorKind::Core => self.core,
            AnchorKind::TeamASpawn => self.team_a_spawn,
            AnchorKind::TeamBSpawn => self.team_b_spawn,
        }
    }

    /// Records the position of an anchor.
    pub fn set(&mut self, kind: AnchorKind, cell: CellCoord) {
        match kind {
            AnchorKind::Core => self.core = Some(cell),
            AnchorKind::TeamASpawn => self.team_a_spawn = Some(cell),
            AnchorKind::TeamBSpawn => self.team_b_spawn = Some(cell),
        }
    }

    /// Spawn position for the provided team.
    #[must_use]
    pub const fn spawn_for(&self, team: Team) -> Option<CellCoord> {
        self.position(AnchorKind::spawn_for(team))
    }

    /// Returns all three positions when every anchor is placed.
    #[must_use]
    pub fn complete(&self) -> Option<[CellCoord; 3]> {
        Some([self.core?, self.team_a_spawn?, self.team_b_spawn?])
    }

    /// Reports whether every anchor has been placed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete().is_some()
    }
}

/// Unique identifier assigned to a thing by the host world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThingId(u64);

impl ThingId {
    /// Creates a new thing identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Unique identifier assigned to a combatant by the host world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(u32);

impl CombatantId {
    /// Creates a new combatant identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a temporary round faction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactionId(u32);

impl FactionId {
    /// Creates a new faction identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Definition name identifying what a thing (or its material) is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DefName(String);

impl DefName {
    /// Wraps the provided definition name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a terrain type laid on a cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerrainId(String);

impl TerrainId {
    /// Wraps the provided terrain name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a roof type covering a cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoofId(String);

impl RoofId {
    /// Wraps the provided roof name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Facing of a placed thing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rotation {
    /// Facing toward increasing z.
    #[default]
    North,
    /// Facing toward increasing x.
    East,
    /// Facing toward decreasing z.
    South,
    /// Facing toward decreasing x.
    West,
}

/// Crafting quality of a thing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    /// Lowest quality tier.
    Awful,
    /// Below-average quality.
    Poor,
    /// Baseline quality.
    Normal,
    /// Above-average quality.
    Good,
    /// High quality.
    Excellent,
    /// Near-perfect quality.
    Masterwork,
    /// Highest quality tier.
    Legendary,
}

/// Hit points tracked for a thing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Durability {
    max: u32,
    current: u32,
}

impl Durability {
    /// Creates durability with the provided values; `current` is capped at `max`.
    #[must_use]
    pub fn new(max: u32, current: u32) -> Self {
        Self {
            max,
            current: current.min(max),
        }
    }

    /// Creates undamaged durability.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self { max, current: max }
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Reports whether no damage has been taken.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Returns a copy restored to maximum hit points.
    #[must_use]
    pub const fn healed(self) -> Self {
        Self::full(self.max)
    }

    /// Returns a copy with `amount` hit points removed.
    #[must_use]
    pub const fn damaged(self, amount: u32) -> Self {
        Self {
            max: self.max,
            current: self.current.saturating_sub(amount),
        }
    }
}

/// Broad category a thing belongs to in the host world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingCategory {
    /// Constructed structure such as a wall, door or turret.
    Building,
    /// Growing plant or tree.
    Plant,
    /// Living combatant or animal.
    Pawn,
    /// Remains of a dead pawn.
    Corpse,
    /// Ground filth such as blood or dirt.
    Filth,
    /// Dropped, free-standing item.
    Item,
    /// Projectile in flight.
    Projectile,
    /// Gas cloud.
    Gas,
    /// Burning fire.
    Fire,
    /// Designation-like object with no physical presence.
    Ethereal,
    /// Anything the host does not classify further.
    Other,
}

/// Key identifying interchangeable things during reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThingKey {
    /// Definition of the thing.
    pub def: DefName,
    /// Material the thing is made from, if any.
    pub stuff: Option<DefName>,
    /// Facing of the thing.
    pub rotation: Rotation,
}

/// Everything required to instantiate a thing in the world.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThingBlueprint {
    /// Definition of the thing.
    pub def: DefName,
    /// Material the thing is made from, if any.
    pub stuff: Option<DefName>,
    /// Facing of the thing.
    pub rotation: Rotation,
    /// Category the thing belongs to.
    pub category: ThingCategory,
    /// Hit points of the thing.
    pub durability: Durability,
    /// Crafting quality, if the definition has one.
    pub quality: Option<QualityTier>,
    /// Whether the thing exposes building-specific properties.
    pub has_building_properties: bool,
    /// Whether the thing is an active (non-inert) structure.
    pub active: bool,
}

impl ThingBlueprint {
    /// Creates a blueprint with full durability and no quality or flags.
    #[must_use]
    pub fn new(def: impl Into<String>, category: ThingCategory, max_hit_points: u32) -> Self {
        Self {
            def: DefName::new(def),
            stuff: None,
            rotation: Rotation::North,
            category,
            durability: Durability::full(max_hit_points),
            quality: None,
            has_building_properties: matches!(category, ThingCategory::Building),
            active: false,
        }
    }

    /// Sets the material of the blueprint.
    #[must_use]
    pub fn with_stuff(mut self, stuff: impl Into<String>) -> Self {
        self.stuff = Some(DefName::new(stuff));
        self
    }

    /// Sets the facing of the blueprint.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the crafting quality of the blueprint.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityTier) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Marks the blueprint as an active (non-inert) structure.
    #[must_use]
    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }

    /// Reconciliation key of the blueprint.
    #[must_use]
    pub fn key(&self) -> ThingKey {
        ThingKey {
            def: self.def.clone(),
            stuff: self.stuff.clone(),
            rotation: self.rotation,
        }
    }
}

/// Immutable representation of a single thing's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThingSnapshot {
    /// Identifier allocated to the thing by the world.
    pub id: ThingId,
    /// Cell the thing occupies.
    pub cell: CellCoord,
    /// Definition of the thing.
    pub def: DefName,
    /// Material the thing is made from, if any.
    pub stuff: Option<DefName>,
    /// Facing of the thing.
    pub rotation: Rotation,
    /// Category the thing belongs to.
    pub category: ThingCategory,
    /// Hit points of the thing.
    pub durability: Durability,
    /// Crafting quality, if the definition has one.
    pub quality: Option<QualityTier>,
    /// Whether the thing exposes building-specific properties.
    pub has_building_properties: bool,
    /// Whether the thing is an active (non-inert) structure.
    pub active: bool,
    /// Anchor marker attached when the thing was created as an arena anchor.
    pub anchor: Option<AnchorKind>,
    /// Runtime type namespace reported by the host for the thing.
    pub type_namespace: String,
}

impl ThingSnapshot {
    /// Reconciliation key of the thing.
    #[must_use]
    pub fn key(&self) -> ThingKey {
        ThingKey {
            def: self.def.clone(),
            stuff: self.stuff.clone(),
            rotation: self.rotation,
        }
    }
}

/// Terrain, roof and ground cover of a single cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSurface {
    /// Terrain laid on the cell.
    pub terrain: TerrainId,
    /// Roof covering the cell, if any.
    pub roof: Option<RoofId>,
    /// Depth of ground cover such as snow, in `[0, 1]`.
    pub ground_cover: f32,
}

/// What a combatant is currently doing according to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    /// Standing still with no queued job.
    Idle,
    /// Wandering without purpose.
    Wandering,
    /// Fleeing from danger.
    Fleeing,
    /// Executing an attack order.
    Attacking,
    /// Executing a purposeful move.
    Moving,
}

impl Activity {
    /// Reports whether the combatant lacks a purposeful order.
    #[must_use]
    pub const fn needs_orders(self) -> bool {
        matches!(self, Activity::Idle | Activity::Wandering | Activity::Fleeing)
    }
}

/// Behavioural order issued to a combatant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    /// Close in and strike the target in melee.
    AttackMelee {
        /// Combatant to attack.
        target: CombatantId,
    },
    /// Shoot the target from range.
    AttackRanged {
        /// Combatant to attack.
        target: CombatantId,
    },
    /// Walk to the provided cell.
    MoveTo {
        /// Destination cell.
        cell: CellCoord,
    },
}

/// Immutable representation of a combatant used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombatantSnapshot {
    /// Identifier allocated to the combatant by the world.
    pub id: CombatantId,
    /// Team the combatant fights for.
    pub team: Team,
    /// Cell currently occupied by the combatant.
    pub cell: CellCoord,
    /// Current activity reported by the host.
    pub activity: Activity,
    /// Declared weapon range in cells; [`MELEE_REACH`] or less means melee only.
    pub weapon_range: u32,
    /// Whether the combatant has died.
    pub dead: bool,
}

/// Read-only view over the combatants relevant to a round.
#[derive(Clone, Debug, Default)]
pub struct CombatantView {
    snapshots: Vec<CombatantSnapshot>,
}

impl CombatantView {
    /// Creates a new combatant view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<CombatantSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots.dedup_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Looks up the snapshot for the provided combatant.
    #[must_use]
    pub fn get(&self, id: CombatantId) -> Option<&CombatantSnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &CombatantSnapshot> {
        self.snapshots.iter()
    }

    /// Number of combatants in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no combatants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the terrain laid on a cell.
    SetTerrain {
        /// Cell to modify.
        cell: CellCoord,
        /// Terrain to lay.
        terrain: TerrainId,
    },
    /// Replaces or clears the roof covering a cell.
    SetRoof {
        /// Cell to modify.
        cell: CellCoord,
        /// Roof to place, or `None` to clear it.
        roof: Option<RoofId>,
    },
    /// Sets the ground cover depth of a cell.
    SetGroundCover {
        /// Cell to modify.
        cell: CellCoord,
        /// New depth in `[0, 1]`.
        depth: f32,
    },
    /// Removes every designation marker from a cell.
    ClearDesignations {
        /// Cell to modify.
        cell: CellCoord,
    },
    /// Destroys a thing.
    DestroyThing {
        /// Thing to destroy.
        thing: ThingId,
    },
    /// Instantiates a thing at a cell.
    SpawnThing {
        /// Cell receiving the thing.
        cell: CellCoord,
        /// Description of the thing to create.
        blueprint: ThingBlueprint,
    },
    /// Restores a thing to full durability.
    HealThing {
        /// Thing to heal.
        thing: ThingId,
    },
    /// Pauses the host simulation clock.
    PauseSimulation,
    /// Resumes the host simulation clock at normal speed.
    ResumeSimulation,
    /// Creates a temporary faction for a team, hostile to every other round faction.
    CreateFaction {
        /// Team represented by the faction.
        team: Team,
    },
    /// Removes a temporary faction.
    RemoveFaction {
        /// Faction to remove.
        faction: FactionId,
    },
    /// Spawns a combatant for a roster slot.
    SpawnCombatant {
        /// Team the combatant fights for.
        team: Team,
        /// Faction the combatant belongs to.
        faction: FactionId,
        /// Position within the team roster.
        slot: usize,
        /// Display label shown above the combatant.
        label: String,
        /// Cell the combatant appears at.
        cell: CellCoord,
    },
    /// Removes a combatant from the world.
    DespawnCombatant {
        /// Combatant to remove.
        combatant: CombatantId,
    },
    /// Forces a combatant into the engaged, non-fleeing, full-morale state.
    ForceEngaged {
        /// Combatant to engage.
        combatant: CombatantId,
        /// Whether queued jobs should be discarded as well.
        clear_jobs: bool,
    },
    /// Issues a behavioural order to a combatant.
    IssueOrder {
        /// Combatant receiving the order.
        combatant: CombatantId,
        /// Order to execute.
        order: Order,
    },
}

/// Events broadcast by the world after processing commands or simulating.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a thing was destroyed.
    ThingDestroyed {
        /// Identifier of the destroyed thing.
        thing: ThingId,
    },
    /// Confirms that a thing was created.
    ThingSpawned {
        /// Identifier assigned to the new thing.
        thing: ThingId,
        /// Cell the thing occupies.
        cell: CellCoord,
    },
    /// Announces that the simulation clock was paused.
    SimulationPaused,
    /// Announces that the simulation clock was resumed.
    SimulationResumed,
    /// Confirms that a round faction was created.
    FactionCreated {
        /// Team represented by the faction.
        team: Team,
        /// Identifier assigned to the faction.
        faction: FactionId,
    },
    /// Confirms that a round faction was removed.
    FactionRemoved {
        /// Identifier of the removed faction.
        faction: FactionId,
    },
    /// Confirms that a combatant was spawned for a roster slot.
    CombatantSpawned {
        /// Team the combatant fights for.
        team: Team,
        /// Position within the team roster.
        slot: usize,
        /// Identifier assigned to the combatant.
        combatant: CombatantId,
    },
    /// Confirms that a combatant was removed.
    CombatantDespawned {
        /// Identifier of the removed combatant.
        combatant: CombatantId,
    },
    /// Reports that a combatant died.
    CombatantDied {
        /// Combatant that died.
        victim: CombatantId,
        /// Combatant credited with the kill, if any.
        killer: Option<CombatantId>,
    },
}

/// Failures reported by the host world for a single operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The cell lies outside the map.
    #[error("cell {cell} is outside the map")]
    OutOfBounds {
        /// Offending cell.
        cell: CellCoord,
    },
    /// The cell exists but cannot currently be read or modified.
    #[error("cell {cell} is unavailable")]
    CellUnavailable {
        /// Offending cell.
        cell: CellCoord,
    },
    /// No thing with the provided identifier exists.
    #[error("thing {} does not exist", thing.get())]
    MissingThing {
        /// Identifier that was looked up.
        thing: ThingId,
    },
    /// No combatant with the provided identifier exists.
    #[error("combatant {} does not exist", combatant.get())]
    MissingCombatant {
        /// Identifier that was looked up.
        combatant: CombatantId,
    },
    /// No faction with the provided identifier exists.
    #[error("faction {} does not exist", faction.get())]
    MissingFaction {
        /// Identifier that was looked up.
        faction: FactionId,
    },
}

/// Read and write access to the host world the arena lives in.
///
/// Queries are side-effect free. Every mutation is expressed as a [`Command`]
/// passed to [`ArenaWorld::apply`], which reports the outcome as events.
pub trait ArenaWorld {
    /// Extents of the host map.
    fn map_size(&self) -> MapSize;

    /// Terrain, roof and ground cover of a cell.
    fn surface(&self, cell: CellCoord) -> Result<CellSurface, WorldError>;

    /// Every thing occupying a cell, in identifier order.
    fn things_at(&self, cell: CellCoord) -> Result<Vec<ThingSnapshot>, WorldError>;

    /// Every thing on the map that satisfies `predicate`, in identifier order.
    fn find_things(&self, predicate: &dyn Fn(&ThingSnapshot) -> bool) -> Vec<ThingSnapshot>;

    /// Reports whether a combatant could stand on the cell.
    fn is_standable(&self, cell: CellCoord) -> bool;

    /// Current state of a combatant, if it still exists.
    fn combatant(&self, id: CombatantId) -> Option<CombatantSnapshot>;

    /// Reports whether the host simulation clock is paused.
    fn is_paused(&self) -> bool;

    /// Executes a command, appending the resulting events to `out_events`.
    fn apply(&mut self, command: Command, out_events: &mut Vec<Event>) -> Result<(), WorldError>;
}
