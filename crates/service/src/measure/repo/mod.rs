pub mod seaorm;

pub use seaorm::SeaOrmMeasureRepository;
