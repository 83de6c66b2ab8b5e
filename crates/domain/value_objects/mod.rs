pub mod field_rules;
pub mod periods;
pub mod user_subscriptions;
