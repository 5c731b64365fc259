pub mod appointments;
pub mod quotes;

pub use appointments::{AppointmentService, BookedAppointment};
pub use quotes::{QuoteDetail, QuoteService, SubmittedQuote};
