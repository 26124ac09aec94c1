pub mod assignment;
pub mod bed;
pub mod department;
pub mod enums;
pub mod patient;
pub mod view;

pub use assignment::*;
pub use bed::*;
pub use department::*;
pub use enums::*;
pub use patient::*;
pub use view::*;
