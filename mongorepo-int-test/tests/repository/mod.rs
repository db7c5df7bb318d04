mod async_repository_test;
mod builder_test;
mod partial_update_test;
mod repository_test;
