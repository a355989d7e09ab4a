mod card;
mod category;
mod ids;
pub mod lenient;
mod summary;

pub use card::{Card, CardBuilder};
pub use category::{Category, FREQUENT_FOLDER, QUOTE_FOLDER};
pub use ids::CardId;
pub use summary::{CardIndex, CardSummary};
