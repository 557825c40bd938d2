//! Closed subject sets for both directions of routing (spec §4.6), replacing
//! dynamic dispatch by string with an exhaustive tagged variant per spec §9
//! REDESIGN FLAGS ("subject → handler map... and an exhaustive tagged
//! variant for the fixed closed subject set").

/// Subjects dispatched to when an inbound cloud message addresses
/// `controller` or `updater`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudSubject {
    /// `heartbeat` — cloud-side liveness ping.
    Heartbeat,
    /// `system_info` — request for a fresh system-info snapshot.
    SystemInfo,
    /// `ntp_status` — request for the current NTP availability.
    NtpStatus,
    /// `check_updates` — trigger a release-feed check.
    CheckUpdates,
    /// `update` — apply a pending update to a named component.
    Update,
    /// Any subject outside the closed set — logged and dropped, kept as a
    /// data-driven fallback for forward compatibility (spec §9).
    Unknown(String),
}

impl CloudSubject {
    /// Classify a bare subject string (already stripped of its recipient
    /// prefix).
    #[must_use]
    pub fn parse(subject: &str) -> Self {
        match subject {
            "heartbeat" => Self::Heartbeat,
            "system_info" => Self::SystemInfo,
            "ntp_status" => Self::NtpStatus,
            "check_updates" => Self::CheckUpdates,
            "update" => Self::Update,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Subjects published to the cloud verbatim when received on the local bus
/// (spec §4.6's closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishableSubject {
    /// `gpio_state`
    GpioState,
    /// `sequence_state`
    SequenceState,
    /// `sequence`
    Sequence,
    /// `playing_time`
    PlayingTime,
    /// `log`
    Log,
    /// `current_schedule`
    CurrentSchedule,
    /// `next_actions`
    NextActions,
    /// `last_executed_action`
    LastExecutedAction,
    /// `scheduler_status`
    SchedulerStatus,
    /// `modes_list`
    ModesList,
    /// `analytics_metrics`
    AnalyticsMetrics,
}

impl PublishableSubject {
    /// Match a bare subject string against the closed publishable set.
    #[must_use]
    pub fn parse(subject: &str) -> Option<Self> {
        Some(match subject {
            "gpio_state" => Self::GpioState,
            "sequence_state" => Self::SequenceState,
            "sequence" => Self::Sequence,
            "playing_time" => Self::PlayingTime,
            "log" => Self::Log,
            "current_schedule" => Self::CurrentSchedule,
            "next_actions" => Self::NextActions,
            "last_executed_action" => Self::LastExecutedAction,
            "scheduler_status" => Self::SchedulerStatus,
            "modes_list" => Self::ModesList,
            "analytics_metrics" => Self::AnalyticsMetrics,
            _ => return None,
        })
    }
}

/// Subjects dispatched to for an inbound local-bus message (spec §4.6's
/// "take the third dotted segment as the logical subject").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSubject {
    /// `heartbeat` — a component reporting liveness.
    Heartbeat,
    /// `get_ntp_status` — scheduler asking for current NTP availability.
    GetNtpStatus,
    /// `get_version` — a component asking for version info.
    GetVersion,
    /// One of the closed set of subjects republished to the cloud verbatim.
    Publishable(PublishableSubject),
    /// Anything outside the above — logged and dropped.
    Unknown(String),
}

impl LocalSubject {
    /// Classify the logical (third-segment) subject of a local bus message.
    #[must_use]
    pub fn parse(subject: &str) -> Self {
        match subject {
            "heartbeat" => Self::Heartbeat,
            "get_ntp_status" => Self::GetNtpStatus,
            "get_version" => Self::GetVersion,
            other => match PublishableSubject::parse(other) {
                Some(publishable) => Self::Publishable(publishable),
                None => Self::Unknown(other.to_string()),
            },
        }
    }
}

/// Extract the logical subject from a full local bus subject
/// (`<root>.<recipient>.<subject>`), i.e. its third dotted segment.
#[must_use]
pub fn local_logical_subject(full_subject: &str) -> Option<&str> {
    full_subject.splitn(3, '.').nth(2)
}
