pub mod db;
pub mod podcast_host;
pub mod storage;
