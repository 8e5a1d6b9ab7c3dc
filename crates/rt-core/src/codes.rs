//! Telemetry code tables.
//!
//! Vehicles report their state as small decimal (occasionally hex) codes.
//! Each table maps the wire code to a closed enum.  Unknown codes are not an
//! error at this layer; callers decide between rejecting the report and
//! falling back to `None`.

/// Vehicle operating state (report field 3).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum VehicleState {
    Run,
    Stop,
    Abnormal,
    Manual,
    Removing,
    /// Stopped by an obstacle sensor or buzzer.
    ObstacleStop,
    Jam,
    HtStop,
    /// E84 hand-off timed out at a port.
    HandoffTimeout,
}

impl VehicleState {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim() {
            "1" => VehicleState::Run,
            "2" => VehicleState::Stop,
            "3" => VehicleState::Abnormal,
            "4" => VehicleState::Manual,
            "5" => VehicleState::Removing,
            "6" => VehicleState::ObstacleStop,
            "7" => VehicleState::Jam,
            "8" => VehicleState::HtStop,
            "9" => VehicleState::HandoffTimeout,
            _ => return None,
        })
    }

    /// States in which the vehicle is physically advancing along the track.
    pub fn is_travelling(self) -> bool {
        matches!(
            self,
            VehicleState::Run
                | VehicleState::ObstacleStop
                | VehicleState::Jam
                | VehicleState::HandoffTimeout
        )
    }
}

/// Run cycle (report field 10).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum RunCycle {
    #[default]
    None,
    PositionDetect,
    Moving,
    Acquire,
    Deposit,
    Sampling,
    FloorTransfer,
    WheelDrive,
    ManualControl,
    DriveTeaching,
    TransferTeaching,
    Test1,
    Test2,
    Test3,
    BuildingTransfer,
    Evacuation,
}

impl RunCycle {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim().to_ascii_uppercase().as_str() {
            "0" | "00" => RunCycle::None,
            "1" | "01" => RunCycle::PositionDetect,
            "2" | "02" => RunCycle::Moving,
            "3" | "03" => RunCycle::Acquire,
            "4" | "04" => RunCycle::Deposit,
            "5" | "05" => RunCycle::Sampling,
            "9" | "09" => RunCycle::FloorTransfer,
            "21" => RunCycle::WheelDrive,
            "22" => RunCycle::ManualControl,
            "23" => RunCycle::DriveTeaching,
            "24" => RunCycle::TransferTeaching,
            "25" => RunCycle::Test1,
            "26" => RunCycle::Test2,
            "27" => RunCycle::Test3,
            "2E" => RunCycle::BuildingTransfer,
            "2F" => RunCycle::Evacuation,
            _ => return None,
        })
    }

    pub fn is_transfer(self) -> bool {
        matches!(self, RunCycle::Acquire | RunCycle::Deposit)
    }
}

/// Vehicle (job) cycle (report field 11).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum VehicleCycle {
    #[default]
    None,
    Moving,
    AcquireMoving,
    Acquiring,
    DepositMoving,
    Depositing,
    MaintenanceMoving,
    Waiting,
    Input,
}

impl VehicleCycle {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim() {
            "0" => VehicleCycle::None,
            "1" => VehicleCycle::Moving,
            "2" => VehicleCycle::AcquireMoving,
            "3" => VehicleCycle::Acquiring,
            "4" => VehicleCycle::DepositMoving,
            "5" => VehicleCycle::Depositing,
            "6" => VehicleCycle::MaintenanceMoving,
            "7" => VehicleCycle::Waiting,
            "8" => VehicleCycle::Input,
            _ => return None,
        })
    }

    /// Travelling towards a pickup or drop-off.
    pub fn is_transfer_move(self) -> bool {
        matches!(self, VehicleCycle::AcquireMoving | VehicleCycle::DepositMoving)
    }
}

/// Detailed work state (report field 19).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum DetailState {
    #[default]
    None,
    Wait,
    StageWait,
    StandbyWait,
    DepositSignalWait,
    AcquireWait,
    MapWait,
    Moving,
    ParkingUtsMoving,
    StageMoving,
    StandbyMoving,
    BalanceMoving,
    ParkingMoving,
}

impl DetailState {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim() {
            "" | "0" => DetailState::None,
            "1" => DetailState::Wait,
            "2" => DetailState::StageWait,
            "3" => DetailState::StandbyWait,
            "4" => DetailState::DepositSignalWait,
            "5" => DetailState::AcquireWait,
            "6" => DetailState::MapWait,
            "101" => DetailState::Moving,
            "102" => DetailState::ParkingUtsMoving,
            "103" => DetailState::StageMoving,
            "104" => DetailState::StandbyMoving,
            "105" => DetailState::BalanceMoving,
            "106" => DetailState::ParkingMoving,
            _ => return None,
        })
    }
}

/// Carrier family a routing or availability query is made for.
///
/// Loop-restricted rail segments only admit `All` and `Pod`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub enum CarrierClass {
    #[default]
    All,
    Pod,
    Reticle,
    Tray,
}
