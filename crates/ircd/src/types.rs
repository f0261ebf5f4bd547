/// Stable per-connection handle, allocated once on accept and never reused
/// during the process lifetime. All cross-references between clients and
/// channels go through this id, resolved at the registry.
pub type ConnId = usize;

/// Channel name in its lowercased (RFC 1459 casemap) registry-key form.
pub type ChannelName = String;
