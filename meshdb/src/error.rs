use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "mesh '{mesh}' is not fully triangulated ({polygons} polygons, {corners} corners); \
         re-export with triangulation enabled"
    )]
    NotTriangulated {
        mesh: String,
        polygons: usize,
        corners: usize,
    },

    #[error("skeleton has bones unreachable from the root: {}", names.join(", "))]
    SkeletonOrphans { names: Vec<String> },

    #[error("unknown bone '{bone}' referenced by palette of mesh group {mesh}")]
    UnknownPaletteBone { mesh: usize, bone: String },

    #[error("invalid axis code '{value}' for {context}")]
    InvalidAxisCode { context: String, value: String },

    #[error("axis system has identical up and front axes: {value}")]
    DegenerateAxisSystem { value: String },

    #[cfg(feature = "json")]
    #[error("failed to parse scene document: {message}")]
    SceneParse { message: String },

    #[cfg(feature = "json")]
    #[error("failed to serialize scene document: {message}")]
    SceneSerialize { message: String },
}
