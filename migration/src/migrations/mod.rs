pub mod m202608250001_create_users;
pub mod m202608250002_create_classes;
pub mod m202608250003_create_subjects;
pub mod m202608250004_create_students;
pub mod m202608250005_create_teacher_subjects;
pub mod m202608250006_create_attendance_sessions;
pub mod m202608250007_create_attendance_otps;
pub mod m202608250008_create_attendance_records;
