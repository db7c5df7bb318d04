mod entity_derive_test;
mod entity_id_test;
