/// Categories of failure a server reports in a response's error message.
///
/// Protocol-level failures are rendered as `"<prefix>: <detail>"` so the
/// client can classify them; any message without a known prefix came from
/// the handler itself and is an [`RpcResultStatus::Application`] error.
///
/// A handler message that happens to start with a reserved prefix is sent
/// behind the `"application error: "` marker, so it can never be mistaken
/// for a protocol failure.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RpcResultStatus {
    ServiceNotFound,
    MethodNotFound,
    UnsupportedSerializer,
    /// The argument could not be decoded with the request's serializer.
    DecodeFailed,
    /// The handler's result could not be encoded.
    EncodeFailed,
    /// The propagated deadline passed before the handler finished.
    DeadlineExceeded,
    /// Marker answered for fire-and-forget calls. Not a failure.
    OneWayAccepted,
    Application,
}

/// Marks handler errors whose text would otherwise classify as a protocol
/// failure.
pub const APPLICATION_ERROR_MARKER: &str = "application error";

impl RpcResultStatus {
    const PREFIXED: [RpcResultStatus; 7] = [
        RpcResultStatus::ServiceNotFound,
        RpcResultStatus::MethodNotFound,
        RpcResultStatus::UnsupportedSerializer,
        RpcResultStatus::DecodeFailed,
        RpcResultStatus::EncodeFailed,
        RpcResultStatus::DeadlineExceeded,
        RpcResultStatus::OneWayAccepted,
    ];

    pub fn prefix(self) -> Option<&'static str> {
        match self {
            RpcResultStatus::ServiceNotFound => Some("service not found"),
            RpcResultStatus::MethodNotFound => Some("method not found"),
            RpcResultStatus::UnsupportedSerializer => Some("unsupported serializer"),
            RpcResultStatus::DecodeFailed => Some("argument decode failed"),
            RpcResultStatus::EncodeFailed => Some("result encode failed"),
            RpcResultStatus::DeadlineExceeded => Some("deadline exceeded"),
            RpcResultStatus::OneWayAccepted => {
                Some("oneway call accepted, no result will be sent")
            }
            RpcResultStatus::Application => None,
        }
    }

    /// Renders an error message for this status.
    ///
    /// For [`RpcResultStatus::Application`] the detail is passed through
    /// unless it would be misread, in which case it gets the
    /// [`APPLICATION_ERROR_MARKER`] prefix.
    pub fn message(self, detail: &str) -> String {
        match self.prefix() {
            Some(prefix) if detail.is_empty() => prefix.to_owned(),
            Some(prefix) => format!("{prefix}: {detail}"),
            None if Self::needs_marker(detail) => {
                format!("{APPLICATION_ERROR_MARKER}: {detail}")
            }
            None => detail.to_owned(),
        }
    }

    /// Classifies a response error message.
    pub fn classify(message: &str) -> RpcResultStatus {
        if has_prefix(message, APPLICATION_ERROR_MARKER) {
            return RpcResultStatus::Application;
        }

        Self::PREFIXED
            .into_iter()
            .find(|status| status.prefix().is_some_and(|prefix| has_prefix(message, prefix)))
            .unwrap_or(RpcResultStatus::Application)
    }

    /// Returns the handler's own text from an application error message,
    /// removing the marker added by [`message`](Self::message).
    pub fn application_detail(message: &str) -> &str {
        message
            .strip_prefix(APPLICATION_ERROR_MARKER)
            .and_then(|rest| rest.strip_prefix(": "))
            .unwrap_or(message)
    }

    fn needs_marker(detail: &str) -> bool {
        has_prefix(detail, APPLICATION_ERROR_MARKER)
            || Self::PREFIXED
                .into_iter()
                .any(|status| status.prefix().is_some_and(|prefix| has_prefix(detail, prefix)))
    }
}

/// `true` if `message` is exactly `prefix` or starts with `"<prefix>: "`.
fn has_prefix(message: &str, prefix: &str) -> bool {
    message
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(": "))
}
