use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const VECTOR_COLUMN: &str = "vector";
pub const DISTANCE_COLUMN: &str = "_distance";

fn vector_field(dim: i32) -> Field {
	Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true)
}

/// One embedding collection: every row is one `EmbeddingRecord`.
pub fn build_record_schema(dim: i32) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("document_id", DataType::Utf8, false),
		Field::new("metadata", DataType::Utf8, false),
		vector_field(dim),
	]))
}

/// The documents table; `child_document_ids` is stored as a JSON array string.
pub fn build_documents_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("title", DataType::Utf8, false),
		Field::new("core_content", DataType::Utf8, false),
		Field::new("detailed_content", DataType::Utf8, false),
		Field::new("main_topics", DataType::Utf8, false),
		Field::new("sub_topics", DataType::Utf8, false),
		Field::new("raw_content", DataType::Utf8, false),
		Field::new("table_of_contents", DataType::Utf8, true),
		Field::new("child_document_ids", DataType::Utf8, false),
		Field::new("source_type", DataType::Utf8, true),
		Field::new("document_language", DataType::Utf8, true),
	]))
}

/// Dimensionality of the vector column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
	match schema.field_with_name(VECTOR_COLUMN).ok()?.data_type() {
		DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
		_ => None,
	}
}
