mod concurrency;
mod edit_session;
mod notification;
