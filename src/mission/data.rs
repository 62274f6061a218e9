//! Typed views over the ten packed `data` integers of an EventPoint.
//!
//! The meaning of each slot depends on the waypoint type. Every view keeps the
//! raw array and only touches the bits of the field being set, so anything a
//! view does not name survives a read-modify-write.
//!
//! ```text
//! CreateEnemies / AdjustEnemy
//!   [0] lo enemy_type   hi count
//!   [1] follow (EventPoint index)
//!   [2] lo health       hi abilities
//!   [3] move_type
//!   [4] behaviour flags
//!   [5] ai_type
//!   [6] skill
//!   [7] lo target       hi extra flags
//! CreatePlayer    [0] player_type
//! CreateVehicle   [0] vehicle_type [1] behaviour [2] key
//! CreateItem      [0] item_type [1] quantity [2] item_flags [3] container
//! Message         [0] time [1] speaker
//! SoundEffect     [0] sound_kind [1] sound_id
//! Teleport        [0] target
//! BonusPoints     [0] points [1] bonus_kind
//! Conversation    [0] person_a [1] person_b [2] grab_camera
//! CountUpTimer    [0] duration
//! NavBeacon       [0] target
//! ```

use bitflags::bitflags;
use serde::Serialize;

use super::event_point::WaypointType;

pub type RawData = [i32; 10];

fn lo(value: i32) -> u16 {
    (value as u32 & 0xFFFF) as u16
}

fn hi(value: i32) -> u16 {
    (value as u32 >> 16) as u16
}

fn with_lo(value: i32, field: u16) -> i32 {
    ((value as u32 & 0xFFFF_0000) | field as u32) as i32
}

fn with_hi(value: i32, field: u16) -> i32 {
    ((value as u32 & 0x0000_FFFF) | ((field as u32) << 16)) as i32
}

/// Generates named accessors over slots of a `RawData` newtype.
macro_rules! packed_fields {
    ($ty:ident { $($kind:ident $name:ident / $setter:ident => $slot:expr;)* }) => {
        impl $ty {
            $(packed_fields!(@one $kind $name $setter $slot);)*
        }
    };
    (@one full $name:ident $setter:ident $slot:expr) => {
        pub fn $name(&self) -> i32 {
            self.0[$slot]
        }
        pub fn $setter(&mut self, value: i32) {
            self.0[$slot] = value;
        }
    };
    (@one lo $name:ident $setter:ident $slot:expr) => {
        pub fn $name(&self) -> u16 {
            lo(self.0[$slot])
        }
        pub fn $setter(&mut self, value: u16) {
            self.0[$slot] = with_lo(self.0[$slot], value);
        }
    };
    (@one hi $name:ident $setter:ident $slot:expr) => {
        pub fn $name(&self) -> u16 {
            hi(self.0[$slot])
        }
        pub fn $setter(&mut self, value: u16) {
            self.0[$slot] = with_hi(self.0[$slot], value);
        }
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnemyData(pub RawData);

packed_fields!(EnemyData {
    lo enemy_type / set_enemy_type => 0;
    hi count / set_count => 0;
    full follow / set_follow => 1;
    lo health / set_health => 2;
    hi abilities / set_abilities => 2;
    full move_type / set_move_type => 3;
    full behaviour_flags / set_behaviour_flags => 4;
    full ai_type / set_ai_type => 5;
    full skill / set_skill => 6;
    lo target / set_target => 7;
    hi extra_flags / set_extra_flags => 7;
});

bitflags! {
    /// Behaviour bits of an enemy spawn (`data[4]`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct BehaviourFlags: u32 {
        const LAZY = 1 << 0;
        const DILIGENT = 1 << 1;
        const GANG = 1 << 2;
        const FIGHT_BACK = 1 << 3;
        const KILL_PLAYER_ONLY = 1 << 4;
        const ROBOTIC = 1 << 5;
        const RESTRICTED = 1 << 6;
        const ONLY_PLAYER_KILLS = 1 << 7;
        const _ = !0;
    }
}

bitflags! {
    /// Weapons an enemy spawns with (high half of `data[2]`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct AbilityFlags: u16 {
        const PISTOL = 1 << 0;
        const SHOTGUN = 1 << 1;
        const AK47 = 1 << 2;
        const GRENADE = 1 << 3;
        const BALLOON = 1 << 4;
        const KNIFE = 1 << 5;
        const BAT = 1 << 6;
        const _ = !0;
    }
}

bitflags! {
    /// Second behaviour mask (high half of `data[7]`). Bits are kept verbatim.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct ExtraFlags: u16 {
        const _ = !0;
    }
}

impl EnemyData {
    pub fn behaviour(&self) -> BehaviourFlags {
        BehaviourFlags::from_bits_retain(self.behaviour_flags() as u32)
    }

    pub fn set_behaviour(&mut self, flags: BehaviourFlags) {
        self.set_behaviour_flags(flags.bits() as i32);
    }

    pub fn weapons(&self) -> AbilityFlags {
        AbilityFlags::from_bits_retain(self.abilities())
    }

    pub fn set_weapons(&mut self, flags: AbilityFlags) {
        self.set_abilities(flags.bits());
    }

    pub fn extra(&self) -> ExtraFlags {
        ExtraFlags::from_bits_retain(self.extra_flags())
    }

    pub fn set_extra(&mut self, flags: ExtraFlags) {
        self.set_extra_flags(flags.bits());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerData(pub RawData);

packed_fields!(PlayerData {
    full player_type / set_player_type => 0;
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VehicleData(pub RawData);

packed_fields!(VehicleData {
    full vehicle_type / set_vehicle_type => 0;
    full behaviour / set_behaviour => 1;
    full key / set_key => 2;
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemData(pub RawData);

packed_fields!(ItemData {
    full item_type / set_item_type => 0;
    full quantity / set_quantity => 1;
    full item_flags / set_item_flags => 2;
    full container / set_container => 3;
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageData(pub RawData);

packed_fields!(MessageData {
    full time / set_time => 0;
    full speaker / set_speaker => 1;
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SoundData(pub RawData);

packed_fields!(SoundData {
    full sound_kind / set_sound_kind => 0;
    full sound_id / set_sound_id => 1;
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TargetData(pub RawData);

packed_fields!(TargetData {
    full target / set_target => 0;
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BonusData(pub RawData);

packed_fields!(BonusData {
    full points / set_points => 0;
    full bonus_kind / set_bonus_kind => 1;
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversationData(pub RawData);

packed_fields!(ConversationData {
    full person_a / set_person_a => 0;
    full person_b / set_person_b => 1;
    full grab_camera / set_grab_camera => 2;
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerData(pub RawData);

packed_fields!(TimerData {
    full duration / set_duration => 0;
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DataView {
    CreateEnemies(EnemyData),
    AdjustEnemy(EnemyData),
    CreatePlayer(PlayerData),
    CreateVehicle(VehicleData),
    CreateItem(ItemData),
    Message(MessageData),
    SoundEffect(SoundData),
    Teleport(TargetData),
    BonusPoints(BonusData),
    Conversation(ConversationData),
    CountUpTimer(TimerData),
    NavBeacon(TargetData),
    /// Types without a named layout
    Raw(RawData),
}

impl DataView {
    pub fn for_waypoint(waypoint_type: u8, raw: RawData) -> Self {
        use WaypointType as W;
        match WaypointType::from_u8(waypoint_type) {
            Some(W::CreateEnemies) => DataView::CreateEnemies(EnemyData(raw)),
            Some(W::AdjustEnemy) => DataView::AdjustEnemy(EnemyData(raw)),
            Some(W::CreatePlayer) => DataView::CreatePlayer(PlayerData(raw)),
            Some(W::CreateVehicle) => DataView::CreateVehicle(VehicleData(raw)),
            Some(W::CreateItem) => DataView::CreateItem(ItemData(raw)),
            Some(W::Message) => DataView::Message(MessageData(raw)),
            Some(W::SoundEffect) => DataView::SoundEffect(SoundData(raw)),
            Some(W::Teleport) => DataView::Teleport(TargetData(raw)),
            Some(W::BonusPoints) => DataView::BonusPoints(BonusData(raw)),
            Some(W::Conversation) => DataView::Conversation(ConversationData(raw)),
            Some(W::CountUpTimer) => DataView::CountUpTimer(TimerData(raw)),
            Some(W::NavBeacon) => DataView::NavBeacon(TargetData(raw)),
            _ => DataView::Raw(raw),
        }
    }

    pub fn into_raw(self) -> RawData {
        match self {
            DataView::CreateEnemies(EnemyData(raw))
            | DataView::AdjustEnemy(EnemyData(raw))
            | DataView::CreatePlayer(PlayerData(raw))
            | DataView::CreateVehicle(VehicleData(raw))
            | DataView::CreateItem(ItemData(raw))
            | DataView::Message(MessageData(raw))
            | DataView::SoundEffect(SoundData(raw))
            | DataView::Teleport(TargetData(raw))
            | DataView::BonusPoints(BonusData(raw))
            | DataView::Conversation(ConversationData(raw))
            | DataView::CountUpTimer(TimerData(raw))
            | DataView::NavBeacon(TargetData(raw))
            | DataView::Raw(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::event_point::EventPoint;

    #[test]
    fn enemy_packing() {
        let mut raw = [0i32; 10];
        raw[0] = (4 << 16) | 7;
        raw[2] = (0x0003 << 16) | 200;
        raw[7] = (0x8001u32 << 16) as i32 | 12;

        let DataView::CreateEnemies(enemy) = DataView::for_waypoint(3, raw) else {
            panic!("wrong view");
        };
        assert_eq!(enemy.enemy_type(), 7);
        assert_eq!(enemy.count(), 4);
        assert_eq!(enemy.health(), 200);
        assert_eq!(enemy.abilities(), 3);
        assert_eq!(enemy.target(), 12);
        assert_eq!(enemy.extra_flags(), 0x8001);
    }

    #[test]
    fn setters_keep_neighbouring_bits() {
        let mut raw = [0i32; 10];
        raw[0] = 0x1234_5678;
        raw[9] = -1;
        let mut enemy = EnemyData(raw);
        enemy.set_count(2);
        assert_eq!(enemy.0[0], 0x0002_5678);
        enemy.set_enemy_type(0xFFFF);
        assert_eq!(enemy.0[0], 0x0002_FFFF);
        assert_eq!(enemy.0[9], -1);
    }

    #[test]
    fn adjust_enemy_shares_the_layout() {
        let mut ep = EventPoint {
            waypoint_type: WaypointType::AdjustEnemy as u8,
            ..EventPoint::default()
        };
        let DataView::AdjustEnemy(mut enemy) = ep.data_view() else {
            panic!("wrong view");
        };
        enemy.set_health(150);
        enemy.set_abilities(0x10);
        ep.set_data_view(DataView::AdjustEnemy(enemy));
        assert_eq!(ep.data[2], (0x10 << 16) | 150);
    }

    #[test]
    fn flag_views_keep_unnamed_bits() {
        let mut raw = [0i32; 10];
        raw[2] = (0x0105 << 16) | 90;
        raw[4] = (1 << 20) | 0b1001;
        raw[7] = (0x4000 << 16) | 3;
        let mut enemy = EnemyData(raw);

        assert!(enemy.behaviour().contains(BehaviourFlags::LAZY | BehaviourFlags::FIGHT_BACK));
        assert_eq!(enemy.behaviour().bits(), (1 << 20) | 0b1001);
        assert!(enemy.weapons().contains(AbilityFlags::PISTOL | AbilityFlags::AK47));
        assert_eq!(enemy.weapons().bits(), 0x0105);

        enemy.set_behaviour(enemy.behaviour() | BehaviourFlags::GANG);
        assert_eq!(enemy.0[4], (1 << 20) | 0b1101);
        enemy.set_weapons(AbilityFlags::KNIFE);
        assert_eq!(enemy.0[2], (0x20 << 16) | 90);
        enemy.set_extra(enemy.extra() | ExtraFlags::from_bits_retain(1));
        assert_eq!(enemy.0[7], (0x4001 << 16) | 3);
    }

    #[test]
    fn unnamed_types_are_raw() {
        let raw = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        assert_eq!(DataView::for_waypoint(1, raw), DataView::Raw(raw));
        assert_eq!(DataView::for_waypoint(200, raw).into_raw(), raw);
        let view = DataView::for_waypoint(WaypointType::NavBeacon as u8, raw);
        assert!(matches!(view, DataView::NavBeacon(t) if t.target() == 1));
    }
}
