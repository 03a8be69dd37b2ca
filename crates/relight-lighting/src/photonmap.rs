use relight_geom::{Rgb, Vec2};

/// Photon energy deposited over an instance's lightmap grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Photonmap {
    width: u32,
    height: u32,
    energy: Vec<Rgb>,
    count: Vec<u32>,
    irradiance: Vec<Rgb>,
}

impl Photonmap {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let n = (width as usize) * (height as usize);
        Self {
            width,
            height,
            energy: vec![Rgb::BLACK; n],
            count: vec![0; n],
            irradiance: vec![Rgb::BLACK; n],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn texel(&self, uv: Vec2) -> usize {
        let x = ((uv.x.clamp(0.0, 1.0) * self.width as f32) as u32).min(self.width - 1);
        let y = ((uv.y.clamp(0.0, 1.0) * self.height as f32) as u32).min(self.height - 1);
        y as usize * self.width as usize + x as usize
    }

    pub fn deposit(&mut self, uv: Vec2, energy: Rgb) {
        let i = self.texel(uv);
        self.energy[i] += energy;
        self.count[i] += 1;
    }

    pub fn photon_count(&self) -> u64 {
        self.count.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn clear(&mut self) {
        self.energy.fill(Rgb::BLACK);
        self.count.fill(0);
        self.irradiance.fill(Rgb::BLACK);
    }

    /// Box-filters deposited energy over `radius` texels and divides by the
    /// covered surface, `texel_area` being the world area of one texel.
    pub fn gather(&mut self, radius: u32, texel_area: f32) {
        let (w, h) = (self.width as i64, self.height as i64);
        let r = radius as i64;
        let area = texel_area.max(f32::EPSILON);
        for y in 0..h {
            for x in 0..w {
                let mut sum = Rgb::BLACK;
                let mut texels = 0u32;
                for ny in (y - r).max(0)..=(y + r).min(h - 1) {
                    for nx in (x - r).max(0)..=(x + r).min(w - 1) {
                        sum += self.energy[(ny * w + nx) as usize];
                        texels += 1;
                    }
                }
                self.irradiance[(y * w + x) as usize] = sum / (texels as f32 * area);
            }
        }
    }

    /// Gathered irradiance at a lightmap coordinate.
    pub fn sample(&self, uv: Vec2) -> Rgb {
        self.irradiance[self.texel(uv)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_spreads_energy_over_the_box() {
        let mut pm = Photonmap::new(4, 4);
        pm.deposit(Vec2::new(0.3, 0.3), Rgb::gray(9.0));
        assert_eq!(pm.photon_count(), 1);
        pm.gather(1, 1.0);
        // Texel (1,1) sees a full 3x3 box.
        assert_eq!(pm.sample(Vec2::new(0.3, 0.3)), Rgb::gray(1.0));
        assert_eq!(pm.sample(Vec2::new(0.9, 0.9)), Rgb::BLACK);
        pm.clear();
        assert_eq!(pm.photon_count(), 0);
        assert_eq!(pm.sample(Vec2::new(0.3, 0.3)), Rgb::BLACK);
    }

    #[test]
    fn out_of_range_uvs_clamp_to_the_border() {
        let mut pm = Photonmap::new(2, 2);
        pm.deposit(Vec2::new(1.5, -0.5), Rgb::WHITE);
        pm.gather(0, 1.0);
        assert_eq!(pm.sample(Vec2::new(0.99, 0.0)), Rgb::WHITE);
    }
}
