mod store;
mod updater;

pub use store::PgProgressStore;
pub use updater::ProgressUpdater;
