mod adam;
mod gradient_descent;
mod gradient_descent_with_momentum;
mod lookahead;
mod optimizer;
mod slots;

pub use adam::Adam;
pub use gradient_descent::GradientDescent;
pub use gradient_descent_with_momentum::GradientDescentWithMomentum;
pub use lookahead::Lookahead;
pub use optimizer::Optimizer;
pub(crate) use slots::Slots;
