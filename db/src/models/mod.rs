pub mod attendance_otp;
pub mod attendance_record;
pub mod attendance_session;
pub mod class;
pub mod student;
pub mod subject;
pub mod teacher_subject;
pub mod user;
