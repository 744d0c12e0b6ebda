use rand::Rng;

use crate::canvas::LineStyle;

use super::PatternContext;

const PARTICLE_COUNT: usize = 200;
const LINK_DISTANCE: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
struct Particle {
    x: f64,
    y: f64,
    radius: f64,
    opacity: f64,
}

pub(super) fn draw<R: Rng + ?Sized>(ctx: &mut PatternContext<'_>, rng: &mut R) {
    let geometry = ctx.geometry;
    let particles: Vec<Particle> = (0..PARTICLE_COUNT)
        .map(|_| Particle {
            x: rng.gen::<f64>() * geometry.width,
            y: rng.gen::<f64>() * geometry.height,
            radius: rng.gen::<f64>() * 4.0 + 1.0,
            opacity: rng.gen::<f64>() * 0.8 + 0.2,
        })
        .collect();

    let fill = ctx.gray(200, 100);
    for particle in &particles {
        // no floor: far corners fade to half strength
        let distance = geometry.distance_from_center(particle.x, particle.y);
        let modifier = 1.0 - (distance / geometry.max_radius) * 0.5;
        ctx.canvas.fill_circle(
            particle.x,
            particle.y,
            particle.radius,
            fill.with_alpha(particle.opacity * modifier),
        );
    }

    let link = LineStyle::solid(ctx.colors.accent.with_alpha(0.08), 1.0);
    for (index, a) in particles.iter().enumerate() {
        for b in &particles[index + 1..] {
            if (a.x - b.x).hypot(a.y - b.y) < LINK_DISTANCE {
                ctx.canvas.stroke_line(a.x, a.y, b.x, b.y, &link);
            }
        }
    }
}
