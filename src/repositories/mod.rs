pub(crate) mod classes;
pub(crate) mod enrollments;
pub(crate) mod exams;
pub(crate) mod plagiarism_checks;
pub(crate) mod reports;
pub(crate) mod sessions;
pub(crate) mod users;
pub(crate) mod violations;
