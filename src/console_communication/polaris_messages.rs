use crate::flight_control::MissionStatus;
use crate::flight_control::sequencing::MissionPhase;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Upstream {
    #[prost(oneof = "UpstreamContent", tags = "1, 2, 3, 4, 5")]
    pub content: Option<UpstreamContent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Downstream {
    #[prost(oneof = "DownstreamContent", tags = "1, 2, 3, 4")]
    pub content: Option<DownstreamContent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ping {
    #[prost(string, optional, tag = "1")]
    pub echo: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pong {
    #[prost(string, optional, tag = "1")]
    pub echo: Option<String>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Arm {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Launch {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Abort {}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct GetStatus {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CommandResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    /// Phase after the command was handled, as status string.
    #[prost(string, tag = "2")]
    pub phase: String,
    /// Rejection code (`NOT_GROUND`, `NOT_ARMED`, ...), empty on success.
    #[prost(string, tag = "3")]
    pub reason: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Status {
    #[prost(string, tag = "1")]
    pub phase: String,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Telemetry {
    /// Mission time in milliseconds.
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(enumeration = "PayloadPhase", tag = "2")]
    pub phase: i32,
    #[prost(bool, tag = "3")]
    pub thruster_left: bool,
    #[prost(bool, tag = "4")]
    pub thruster_right: bool,
    #[prost(float, tag = "5")]
    pub pid_error: f32,
    #[prost(float, tag = "6")]
    pub pid_output: f32,
}

impl From<MissionStatus> for Telemetry {
    fn from(status: MissionStatus) -> Self {
        Self {
            timestamp: status.at.num_milliseconds(),
            phase: PayloadPhase::from(status.phase) as i32,
            thruster_left: status.left_thruster,
            thruster_right: status.right_thruster,
            pid_error: status.pid_error,
            pid_output: status.pid_output,
        }
    }
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum UpstreamContent {
    #[prost(message, tag = "1")]
    Ping(Ping),
    #[prost(message, tag = "2")]
    Arm(Arm),
    #[prost(message, tag = "3")]
    Launch(Launch),
    #[prost(message, tag = "4")]
    Abort(Abort),
    #[prost(message, tag = "5")]
    GetStatus(GetStatus),
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum DownstreamContent {
    #[prost(message, tag = "1")]
    Pong(Pong),
    #[prost(message, tag = "2")]
    CommandResponse(CommandResponse),
    #[prost(message, tag = "3")]
    Status(Status),
    #[prost(message, tag = "4")]
    Telemetry(Telemetry),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PayloadPhase {
    Ground = 0,
    Armed = 1,
    Ascent = 2,
    GncActive = 3,
    PyroFired = 4,
    Landed = 5,
}

impl From<MissionPhase> for PayloadPhase {
    fn from(value: MissionPhase) -> Self {
        match value {
            MissionPhase::Ground => PayloadPhase::Ground,
            MissionPhase::Armed => PayloadPhase::Armed,
            MissionPhase::Ascent => PayloadPhase::Ascent,
            MissionPhase::GuidanceActive => PayloadPhase::GncActive,
            MissionPhase::PyroFired => PayloadPhase::PyroFired,
            MissionPhase::Landed => PayloadPhase::Landed,
        }
    }
}
