use num_traits::{Float, NumCast};

///
/// Values that can be stored at the leaves of a table and combined with
/// interpolation weights. Vector-valued leaves are combined pointwise.
///
pub trait Ordinate : Clone
{
    /// `weight * self`
    fn scaled(&self, weight: f64) -> Self;
    /// `self += weight * other`
    fn add_scaled(&mut self, weight: f64, other: &Self);
    /// Number of scalar components.
    fn components(&self) -> usize;
}

#[inline]
fn cast<F: Float>(weight: f64) -> F
{
    <F as NumCast>::from(weight).unwrap_or_else(F::nan)
}

macro_rules! impl_scalar_ordinate {
    ($($t:ty),*) => {
        $(
            impl Ordinate for $t
            {
                #[inline]
                fn scaled(&self, weight: f64) -> Self {
                    cast::<$t>(weight) * *self
                }

                #[inline]
                fn add_scaled(&mut self, weight: f64, other: &Self) {
                    *self = *self + cast::<$t>(weight) * *other;
                }

                #[inline]
                fn components(&self) -> usize {
                    1
                }
            }
        )*
    };
}

impl_scalar_ordinate!(f32, f64);

impl<F: Float, const N: usize> Ordinate for [F; N]
{
    #[inline]
    fn scaled(&self, weight: f64) -> Self {
        let w = cast::<F>(weight);
        std::array::from_fn(|i| w * self[i])
    }

    #[inline]
    fn add_scaled(&mut self, weight: f64, other: &Self) {
        let w = cast::<F>(weight);
        self.iter_mut().zip(other).for_each(|(y, &x)| *y = *y + w * x);
    }

    #[inline]
    fn components(&self) -> usize {
        N
    }
}

impl<F: Float> Ordinate for Vec<F>
{
    fn scaled(&self, weight: f64) -> Self {
        let w = cast::<F>(weight);
        self.iter().map(|&x| w * x).collect()
    }

    // compiled tables reject leaves of different lengths
    fn add_scaled(&mut self, weight: f64, other: &Self) {
        let w = cast::<F>(weight);
        self.iter_mut().zip(other).for_each(|(y, &x)| *y = *y + w * x);
    }

    fn components(&self) -> usize {
        self.len()
    }
}

#[test]
fn check_scalar_combination()
{
    let mut y = 2.0_f64.scaled(0.25);
    y.add_scaled(0.75, &6.0);
    assert_eq!(y, 5.0);
    assert_eq!(3.0_f32.scaled(1.0), 3.0);
}

#[test]
fn check_vector_combination()
{
    let a = [1.0, 2.0, 3.0];
    let b = [3.0, 4.0, 5.0];
    let mut y = a.scaled(0.5);
    y.add_scaled(0.5, &b);
    assert_eq!(y, [2.0, 3.0, 4.0]);

    let mut v = vec![1.0_f64, 1.0];
    v.add_scaled(2.0, &vec![1.0, 2.0]);
    assert_eq!(v, vec![3.0, 5.0]);
    // unit weight is the identity
    assert_eq!(b.scaled(1.0), b);

    assert_eq!(b.components(), 3);
    assert_eq!(v.components(), 2);
    assert_eq!(4.0_f64.components(), 1);
}
