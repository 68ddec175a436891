/// Meta key carrying the caller's deadline as milliseconds since the UNIX epoch.
pub const META_DEADLINE_KEY: &str = "deadline";

/// Meta key marking a fire-and-forget call.
pub const META_ONEWAY_KEY: &str = "oneway";

/// The only value of [`META_ONEWAY_KEY`] that marks a call as one-way.
pub const META_ONEWAY_VALUE: &str = "true";
