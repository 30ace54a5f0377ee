pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] catalog_storage::Error),
	#[error(transparent)]
	Service(#[from] catalog_service::Error),
}
