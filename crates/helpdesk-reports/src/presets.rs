//! Named bundles of metric builders

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builders::{
    BuilderContext, BusiestTimeOfDayBuilder, ConversationAgentsBuilder, ConversationTagsBuilder,
    FirstReplyTimesBuilder, NewConversationsBuilder, ReportBuilder, TaggedConversationsBuilder,
};

pub const PRESET_ALL: &str = "all";
pub const PRESET_AGENTS: &str = "agents";
pub const PRESET_TAGS: &str = "tags";

/// Creates a fresh builder list for one report run
pub type BuilderFactory = Arc<dyn Fn(&BuilderContext) -> Vec<Box<dyn ReportBuilder>> + Send + Sync>;

/// Maps preset names to builder factories
#[derive(Clone)]
pub struct PresetRegistry {
    presets: HashMap<String, BuilderFactory>,
}

impl PresetRegistry {
    /// Registry without any presets
    pub fn empty() -> Self {
        Self {
            presets: HashMap::new(),
        }
    }

    /// Registry with the `all`, `agents` and `tags` presets
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(PRESET_ALL, all_builders);
        registry.register(PRESET_AGENTS, |ctx| vec![agents_builder(ctx)]);
        registry.register(PRESET_TAGS, |ctx| {
            vec![
                Box::new(ConversationTagsBuilder::new(ctx.list_limit)) as Box<dyn ReportBuilder>,
                Box::new(TaggedConversationsBuilder::new(ctx.range.clone())),
            ]
        });
        registry
    }

    /// Registers or replaces a preset
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&BuilderContext) -> Vec<Box<dyn ReportBuilder>> + Send + Sync + 'static,
    {
        self.presets.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    /// Fresh builders for `name`, or `None` for an unknown preset
    pub fn builders_for(&self, name: &str, ctx: &BuilderContext) -> Option<Vec<Box<dyn ReportBuilder>>> {
        self.presets.get(name).map(|factory| factory(ctx))
    }

    /// Registered preset names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.presets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for PresetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresetRegistry").field("presets", &self.names()).finish()
    }
}

fn agents_builder(ctx: &BuilderContext) -> Box<dyn ReportBuilder> {
    Box::new(ConversationAgentsBuilder::new(
        Arc::clone(&ctx.store),
        ctx.agent_limit,
        ctx.list_limit,
    ))
}

fn all_builders(ctx: &BuilderContext) -> Vec<Box<dyn ReportBuilder>> {
    vec![
        Box::new(NewConversationsBuilder::new(ctx.range.clone())) as Box<dyn ReportBuilder>,
        Box::new(BusiestTimeOfDayBuilder::new(ctx.range.clone())),
        Box::new(ConversationTagsBuilder::new(ctx.list_limit)),
        Box::new(TaggedConversationsBuilder::new(ctx.range.clone())),
        Box::new(FirstReplyTimesBuilder::new(ctx.first_reply_unit)),
        agents_builder(ctx),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{CONVERSATION_AGENTS, CONVERSATION_TAGS, TAGGED_CONVERSATIONS};
    use crate::date_range::{DateRangeResolver, ReportParams};
    use crate::store::MemoryStore;
    use chrono_tz::Tz;
    use helpdesk_common::ReplyTimeUnit;

    fn context() -> BuilderContext {
        BuilderContext {
            range: DateRangeResolver::new(Tz::UTC)
                .resolve(&ReportParams::between("2024-01-01", "2024-01-31"))
                .unwrap()
                .primary,
            store: Arc::new(MemoryStore::new()),
            list_limit: 10,
            agent_limit: 50,
            first_reply_unit: ReplyTimeUnit::Minutes,
        }
    }

    fn names(builders: &[Box<dyn ReportBuilder>]) -> Vec<String> {
        builders.iter().map(|b| b.name().to_string()).collect()
    }

    #[test]
    fn test_builtin_presets() {
        let registry = PresetRegistry::default();
        assert_eq!(registry.names(), vec!["agents", "all", "tags"]);

        let ctx = context();
        assert_eq!(registry.builders_for(PRESET_ALL, &ctx).unwrap().len(), 6);
        assert_eq!(
            names(&registry.builders_for(PRESET_AGENTS, &ctx).unwrap()),
            vec![CONVERSATION_AGENTS]
        );
        assert_eq!(
            names(&registry.builders_for(PRESET_TAGS, &ctx).unwrap()),
            vec![CONVERSATION_TAGS, TAGGED_CONVERSATIONS]
        );
    }

    #[test]
    fn test_unknown_preset_has_no_builders() {
        assert!(PresetRegistry::default().builders_for("articles", &context()).is_none());
    }

    #[test]
    fn test_custom_preset_registration() {
        let mut registry = PresetRegistry::default();
        registry.register("weekly", |ctx| {
            vec![Box::new(NewConversationsBuilder::new(ctx.range.clone())) as Box<dyn ReportBuilder>]
        });

        assert!(registry.contains("weekly"));
        assert_eq!(registry.builders_for("weekly", &context()).unwrap().len(), 1);
    }
}
