//! EventPoint records and the waypoint / trigger type tables.

use binrw::binrw;
use serde::{Deserialize, Serialize};

use super::data::DataView;
use crate::math::{ui_to_world, world_to_ui};

pub const EVENT_POINT_SIZE: usize = 74;
pub const MAX_EVENT_POINTS: usize = 512;

/// One scripted world event (74 bytes).
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPoint {
    pub colour: u8,
    pub group: u8,
    pub waypoint_type: u8,
    pub used: u8,
    pub triggered_by: u8,
    pub on_trigger: u8,
    /// 0-255 mapped onto a full turn
    pub direction: u8,
    pub flags: u8,
    pub ep_ref: u16,
    pub ep_ref_bool: u16,
    pub after_timer: u16,
    /// Meaning depends on `waypoint_type`, see [`DataView`]
    pub data: [i32; 10],
    pub radius: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Next EventPoint in the used or free list, 0 for none
    pub next: u16,
    pub prev: u16,
}

impl EventPoint {
    pub fn is_used(&self) -> bool {
        self.used != 0
    }

    pub fn waypoint(&self) -> Option<WaypointType> {
        WaypointType::from_u8(self.waypoint_type)
    }

    pub fn trigger(&self) -> Option<TriggerType> {
        TriggerType::from_u8(self.triggered_by)
    }

    pub fn direction_degrees(&self) -> f32 {
        self.direction as f32 * 360.0 / 256.0
    }

    pub fn set_direction_degrees(&mut self, degrees: f32) {
        let turns = degrees.rem_euclid(360.0) / 360.0;
        self.direction = ((turns * 256.0).round() as u32 % 256) as u8;
    }

    pub fn ui_position(&self) -> (i32, i32) {
        (world_to_ui(self.x), world_to_ui(self.z))
    }

    pub fn set_ui_position(&mut self, px: i32, py: i32) {
        self.x = ui_to_world(px);
        self.z = ui_to_world(py);
    }

    /// Typed view of `data` for this EventPoint's waypoint type.
    pub fn data_view(&self) -> DataView {
        DataView::for_waypoint(self.waypoint_type, self.data)
    }

    pub fn set_data_view(&mut self, view: DataView) {
        self.data = view.into_raw();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WaypointType {
    None = 0,
    Simple = 1,
    CreatePlayer = 2,
    CreateEnemies = 3,
    CreateVehicle = 4,
    CreateItem = 5,
    CreateCreature = 6,
    CreateCamera = 7,
    CreateTarget = 8,
    CreateMapExit = 9,
    CameraWaypoint = 10,
    TargetWaypoint = 11,
    Message = 12,
    SoundEffect = 13,
    VisualEffect = 14,
    CutScene = 15,
    Teleport = 16,
    TeleportTarget = 17,
    EndGameLose = 18,
    Shout = 19,
    ActivatePrim = 20,
    CreateTrap = 21,
    AdjustEnemy = 22,
    LinkPlatform = 23,
    CreateBomb = 24,
    BurnPrim = 25,
    EndGameWin = 26,
    NavBeacon = 27,
    SpotEffect = 28,
    CreateBarrel = 29,
    KillWaypoint = 30,
    CreateTreasure = 31,
    BonusPoints = 32,
    GroupLife = 33,
    GroupDeath = 34,
    Conversation = 35,
    Increment = 36,
    DynamicLight = 37,
    GotoThereDoThis = 38,
    TransferPlayer = 39,
    Autosave = 40,
    MakeSearchable = 41,
    LockVehicle = 42,
    GroupReset = 43,
    CountUpTimer = 44,
    ResetCounter = 45,
    CreateMist = 46,
    EnemyFlags = 47,
    StallCar = 48,
    Extend = 49,
    MoveThing = 50,
    MakePersonPee = 51,
    ConePenalties = 52,
    Sign = 53,
    WareFx = 54,
    NoFloor = 55,
    ShakeCamera = 56,
}

impl WaypointType {
    const ALL: [WaypointType; 57] = [
        Self::None,
        Self::Simple,
        Self::CreatePlayer,
        Self::CreateEnemies,
        Self::CreateVehicle,
        Self::CreateItem,
        Self::CreateCreature,
        Self::CreateCamera,
        Self::CreateTarget,
        Self::CreateMapExit,
        Self::CameraWaypoint,
        Self::TargetWaypoint,
        Self::Message,
        Self::SoundEffect,
        Self::VisualEffect,
        Self::CutScene,
        Self::Teleport,
        Self::TeleportTarget,
        Self::EndGameLose,
        Self::Shout,
        Self::ActivatePrim,
        Self::CreateTrap,
        Self::AdjustEnemy,
        Self::LinkPlatform,
        Self::CreateBomb,
        Self::BurnPrim,
        Self::EndGameWin,
        Self::NavBeacon,
        Self::SpotEffect,
        Self::CreateBarrel,
        Self::KillWaypoint,
        Self::CreateTreasure,
        Self::BonusPoints,
        Self::GroupLife,
        Self::GroupDeath,
        Self::Conversation,
        Self::Increment,
        Self::DynamicLight,
        Self::GotoThereDoThis,
        Self::TransferPlayer,
        Self::Autosave,
        Self::MakeSearchable,
        Self::LockVehicle,
        Self::GroupReset,
        Self::CountUpTimer,
        Self::ResetCounter,
        Self::CreateMist,
        Self::EnemyFlags,
        Self::StallCar,
        Self::Extend,
        Self::MoveThing,
        Self::MakePersonPee,
        Self::ConePenalties,
        Self::Sign,
        Self::WareFx,
        Self::NoFloor,
        Self::ShakeCamera,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Waypoint types whose EventPoints carry a text block in the extras section.
    pub fn has_text(self) -> bool {
        matches!(
            self,
            Self::CreateMapExit
                | Self::Message
                | Self::Shout
                | Self::NavBeacon
                | Self::BonusPoints
                | Self::Conversation
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TriggerType {
    None = 0,
    Dependency = 1,
    Radius = 2,
    Door = 3,
    Tripwire = 4,
    PressurePad = 5,
    ElectricFence = 6,
    WaterLevel = 7,
    SecurityCamera = 8,
    Switch = 9,
    AnimPrim = 10,
    Timer = 11,
    ShoutAll = 12,
    BooleanAnd = 13,
    BooleanOr = 14,
    ItemHeld = 15,
    ItemSeen = 16,
    Killed = 17,
    ShoutAny = 18,
    Countdown = 19,
    EnemyRadius = 20,
    VisibleCountdown = 21,
    Cuboid = 22,
    HalfDead = 23,
    GroupDead = 24,
    PersonSeen = 25,
    PersonUsed = 26,
    PrimDamaged = 27,
    PersonArrested = 28,
    ConversationOver = 29,
    Counter = 30,
    KilledNotArrested = 31,
    CrimeRateAbove = 32,
    CrimeRateBelow = 33,
    PersonIsMurderer = 34,
    PersonInVehicle = 35,
    ThingRadiusDir = 36,
    SpecificItemHeld = 37,
    Random = 38,
    PlayerFiresGun = 39,
    DarciGrabbed = 40,
    PunchedAndKicked = 41,
    MoveRadiusDir = 42,
}

impl TriggerType {
    const ALL: [TriggerType; 43] = [
        Self::None,
        Self::Dependency,
        Self::Radius,
        Self::Door,
        Self::Tripwire,
        Self::PressurePad,
        Self::ElectricFence,
        Self::WaterLevel,
        Self::SecurityCamera,
        Self::Switch,
        Self::AnimPrim,
        Self::Timer,
        Self::ShoutAll,
        Self::BooleanAnd,
        Self::BooleanOr,
        Self::ItemHeld,
        Self::ItemSeen,
        Self::Killed,
        Self::ShoutAny,
        Self::Countdown,
        Self::EnemyRadius,
        Self::VisibleCountdown,
        Self::Cuboid,
        Self::HalfDead,
        Self::GroupDead,
        Self::PersonSeen,
        Self::PersonUsed,
        Self::PrimDamaged,
        Self::PersonArrested,
        Self::ConversationOver,
        Self::Counter,
        Self::KilledNotArrested,
        Self::CrimeRateAbove,
        Self::CrimeRateBelow,
        Self::PersonIsMurderer,
        Self::PersonInVehicle,
        Self::ThingRadiusDir,
        Self::SpecificItemHeld,
        Self::Random,
        Self::PlayerFiresGun,
        Self::DarciGrabbed,
        Self::PunchedAndKicked,
        Self::MoveRadiusDir,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Shout triggers carry the shout text in the extras section.
    pub fn has_text(self) -> bool {
        matches!(self, Self::ShoutAll | Self::ShoutAny)
    }
}
