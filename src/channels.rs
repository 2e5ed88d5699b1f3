use crate::models::{ChannelId, StreamKind};
use std::collections::HashMap;

/// Maps channel ids handed out at subscription time to the stream they carry.
/// Rebuilt on every connection; ids are not stable across reconnects.
#[derive(Debug, Default)]
pub struct ChannelRouter {
    routes: HashMap<ChannelId, StreamKind>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: ChannelId, kind: StreamKind) {
        tracing::debug!("channel {channel} -> {kind:?}");
        self.routes.insert(channel, kind);
    }

    /// `None` means the message is noise for us and should be dropped.
    pub fn classify(&self, channel: &ChannelId) -> Option<StreamKind> {
        self.routes.get(channel).copied()
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_registered_channels_only() {
        let mut router = ChannelRouter::new();
        router.register(ChannelId::Num(17082), StreamKind::Book);
        router.register(ChannelId::Name("trades:BTCUSD".into()), StreamKind::Trades);

        assert_eq!(router.classify(&ChannelId::Num(17082)), Some(StreamKind::Book));
        assert_eq!(
            router.classify(&ChannelId::Name("trades:BTCUSD".into())),
            Some(StreamKind::Trades)
        );
        assert_eq!(router.classify(&ChannelId::Num(1)), None);
    }

    #[test]
    fn re_registration_overwrites_and_clear_forgets() {
        let mut router = ChannelRouter::new();
        router.register(ChannelId::Num(5), StreamKind::Book);
        router.register(ChannelId::Num(5), StreamKind::Trades);
        assert_eq!(router.classify(&ChannelId::Num(5)), Some(StreamKind::Trades));
        assert_eq!(router.len(), 1);

        router.clear();
        assert!(router.is_empty());
        assert_eq!(router.classify(&ChannelId::Num(5)), None);
    }
}
