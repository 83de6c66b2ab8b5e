pub mod user_subscriptions;
