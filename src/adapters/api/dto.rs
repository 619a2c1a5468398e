use serde::Deserialize;

// Board API response wrapper
#[derive(Debug, Deserialize)]
pub struct BoardResponse<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct BoardListResponse<T> {
    pub data: Vec<T>,
}

/// Body of a 201 from the create endpoint. Only the id matters.
#[derive(Debug, Deserialize)]
pub struct CreatedDto {
    #[serde(default)]
    pub id: i64,
}
