use anyhow::{anyhow, Context, Result};
use glam::{Mat4, Vec3};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::{PITCH_AXIS, ROLL_AXIS, YAW_AXIS};
use crate::shader_types::{DirectionalLight, ModelTransformation, PointLight};

/// Runtime representation of a scene.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub directional_lights: Vec<DirectionalLight>,
    pub point_lights: Vec<PointLight>,
}

impl Scene {
    /// Parses the scene XML produced by the authoring tools.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let mut objects = Vec::new();

        for node in document.descendants().filter(|n| n.has_tag_name("object")) {
            let mut object = SceneObject::default();
            object.name = required_text(&node, "name")?;
            object.object_type = optional_text(&node, "type").unwrap_or_else(|| "mesh".to_string());
            object.mesh = optional_text(&node, "mesh");
            object.color = parse_color(optional_text(&node, "color"), object.color)?;
            object.position = parse_vec3(optional_text(&node, "position"), object.position)?;
            object.rotation = parse_vec3(optional_text(&node, "rotation"), object.rotation)?;
            object.scale = parse_vec3(optional_text(&node, "scale"), object.scale)?;
            object.direction = parse_vec3(optional_text(&node, "direction"), object.direction)?;
            object.fov = parse_f32(optional_text(&node, "fov"), object.fov)?;
            object.intensity = parse_f32(optional_text(&node, "intensity"), object.intensity)?;
            object.radius = parse_f32(optional_text(&node, "radius"), object.radius)?;
            object.specular = parse_f32(optional_text(&node, "specular"), object.specular)?;
            objects.push(object);
        }

        let directional_lights = objects
            .iter()
            .filter(|obj| obj.object_type == "directional-light")
            .map(|obj| DirectionalLight {
                direction: obj.direction.normalize_or_zero().to_array(),
                color: obj.color.to_array(),
                intensity: obj.intensity,
            })
            .collect();

        let point_lights = objects
            .iter()
            .filter(|obj| obj.object_type == "point-light")
            .map(|obj| PointLight {
                position: obj.position.to_array(),
                color: obj.color.to_array(),
                intensity: obj.intensity,
                radius: obj.radius,
            })
            .collect();

        Ok(Self {
            objects,
            directional_lights,
            point_lights,
        })
    }

    /// Objects that should be drawn as geometry.
    pub fn mesh_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|obj| obj.wants_mesh())
    }
}

/// Scene object as described by the authoring tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<String>,
    #[serde(default = "default_color")]
    pub color: Vec3,
    #[serde(default)]
    pub position: Vec3,
    /// Euler rotation in degrees, applied pitch-yaw-roll.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    /// Light direction for `directional-light` objects.
    #[serde(default = "default_direction")]
    pub direction: Vec3,
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    /// Falloff distance for `point-light` objects.
    #[serde(default = "default_radius")]
    pub radius: f32,
    /// Material specular coefficient for mesh objects.
    #[serde(default = "default_specular")]
    pub specular: f32,
}

impl SceneObject {
    pub fn wants_mesh(&self) -> bool {
        if self.mesh.is_some() {
            true
        } else {
            matches!(self.object_type.as_str(), "mesh" | "part")
        }
    }

    /// Builds the three per-object transform matrices. They stay separate in
    /// the record; the shading stage composes them.
    pub fn model_transformation(&self) -> ModelTransformation {
        let translation = Mat4::from_translation(self.position);
        let rotation = Mat4::from_axis_angle(PITCH_AXIS, self.rotation.x.to_radians())
            * Mat4::from_axis_angle(YAW_AXIS, self.rotation.y.to_radians())
            * Mat4::from_axis_angle(ROLL_AXIS, self.rotation.z.to_radians());
        let scaling = Mat4::from_scale(self.scale);
        ModelTransformation {
            translation: translation.to_cols_array_2d(),
            rotation: rotation.to_cols_array_2d(),
            scaling: scaling.to_cols_array_2d(),
        }
    }
}

impl Default for SceneObject {
    fn default() -> Self {
        Self {
            name: String::new(),
            object_type: String::new(),
            mesh: None,
            color: default_color(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            direction: default_direction(),
            fov: default_fov(),
            intensity: default_intensity(),
            radius: default_radius(),
            specular: default_specular(),
        }
    }
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_direction() -> Vec3 {
    Vec3::NEG_Y
}

fn default_fov() -> f32 {
    60.0
}

fn default_intensity() -> f32 {
    1.0
}

fn default_radius() -> f32 {
    10.0
}

fn default_specular() -> f32 {
    1.0
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let mut numbers = value
        .split_whitespace()
        .filter_map(|component| component.parse::<f32>().ok());
    let x = numbers
        .next()
        .ok_or_else(|| anyhow!("vector is missing components"))?;
    let y = numbers
        .next()
        .ok_or_else(|| anyhow!("vector is missing components"))?;
    let z = numbers
        .next()
        .ok_or_else(|| anyhow!("vector is missing components"))?;
    Ok(Vec3::new(x, y, z))
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let mut numbers = value
        .split_whitespace()
        .filter_map(|component| component.parse::<f32>().ok());
    let r = numbers
        .next()
        .ok_or_else(|| anyhow!("color is missing components"))?;
    let g = numbers
        .next()
        .ok_or_else(|| anyhow!("color is missing components"))?;
    let b = numbers
        .next()
        .ok_or_else(|| anyhow!("color is missing components"))?;
    Ok(Vec3::new(r / 255.0, g / 255.0, b / 255.0))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <scene>
        <object>
            <name>Camera</name>
            <type>camera</type>
            <fov>90</fov>
        </object>
        <object>
            <name>Sun</name>
            <type>directional-light</type>
            <direction>0 -2 0</direction>
            <intensity>0.8</intensity>
            <color>0 255 51</color>
        </object>
        <object>
            <name>Lamp</name>
            <type>point-light</type>
            <position>0 5 0</position>
            <intensity>2.5</intensity>
            <radius>60</radius>
        </object>
        <object>
            <name>Teapot</name>
            <type>mesh</type>
            <mesh>teapot.obj</mesh>
            <specular>0.5</specular>
        </object>
    </scene>
    "#;

    #[test]
    fn parse_scene_populates_objects_and_lights() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.objects.len(), 4);

        let camera = scene.objects.iter().find(|o| o.name == "Camera").unwrap();
        assert_eq!(camera.object_type, "camera");
        assert_eq!(camera.fov, 90.0);

        assert_eq!(scene.directional_lights.len(), 1);
        let sun = scene.directional_lights[0];
        assert_eq!(sun.direction, [0.0, -1.0, 0.0]);
        assert!((sun.intensity - 0.8).abs() < f32::EPSILON);
        assert_eq!(sun.color, [0.0, 1.0, 0.2]);

        assert_eq!(scene.point_lights.len(), 1);
        let lamp = scene.point_lights[0];
        assert_eq!(lamp.position, [0.0, 5.0, 0.0]);
        assert_eq!(lamp.radius, 60.0);
    }

    #[test]
    fn light_directions_are_normalized_on_extraction() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        let direction = Vec3::from_array(scene.directional_lights[0].direction);
        assert!((direction.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mesh_objects_skips_cameras_and_lights() {
        let scene = Scene::from_xml(SAMPLE).unwrap();
        let names: Vec<_> = scene.mesh_objects().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Teapot"]);
    }

    #[test]
    fn model_transformation_keeps_matrices_separate() {
        let object = SceneObject {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
            scale: Vec3::splat(2.0),
            ..SceneObject::default()
        };
        let transform = object.model_transformation();
        // translation lives in the last column of the translation matrix only
        assert_eq!(transform.translation[3][0], 1.0);
        assert_eq!(transform.translation[3][1], 2.0);
        assert_eq!(transform.translation[3][2], 3.0);
        assert_eq!(transform.rotation[3][0], 0.0);
        assert_eq!(transform.scaling[0][0], 2.0);
        assert_eq!(transform.scaling[1][1], 2.0);
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><object><type>mesh</type></object></scene>";
        assert!(Scene::from_xml(bad).is_err());
    }
}
